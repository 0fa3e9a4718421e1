use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{compiler_fence, Ordering};

use super::{ByteSink, LineQueue, Result};

/// Mask for the "receive data available" interrupt.
pub trait RxInterrupt {
    fn rx_enabled(&self) -> bool;
    fn enable_rx(&mut self);
    fn disable_rx(&mut self);
}

/// A [`LineQueue`] shared between the receive interrupt and the main loop.
///
/// The interrupt side owns the single [`RxProducer`]. The main loop only
/// reaches the queue through [`SharedLineQueue::lock`], which masks the
/// receive interrupt for as long as the returned guard lives. On a single
/// core this gives each side exclusive access while it runs.
pub struct SharedLineQueue {
    queue: UnsafeCell<LineQueue>,
}

// SAFETY: access is serialised by masking the only other context that
// touches the queue (see `lock` and `producer`).
unsafe impl Sync for SharedLineQueue {}

impl SharedLineQueue {
    pub const fn new() -> Self {
        Self {
            queue: UnsafeCell::new(LineQueue::new()),
        }
    }

    /// Masks the receive interrupt and hands out the queue.
    ///
    /// The interrupt is restored to its previous state when the guard drops,
    /// so locking after the receiver has been shut down keeps it shut down.
    pub fn lock<'a, I: RxInterrupt>(&'a self, irq: &'a mut I) -> QueueLock<'a, I> {
        let was_enabled = irq.rx_enabled();
        irq.disable_rx();
        compiler_fence(Ordering::SeqCst);

        QueueLock {
            // SAFETY: the producer cannot run while the receive interrupt is
            // masked, and the `&mut I` borrow prevents a second lock.
            queue: unsafe { &mut *self.queue.get() },
            irq,
            was_enabled,
        }
    }

    /// Hands out the interrupt-side handle.
    ///
    /// # Safety
    /// Call at most once, and only use the handle from the receive interrupt
    /// handler (or while that interrupt is otherwise masked).
    pub unsafe fn producer(&self) -> RxProducer<'_> {
        RxProducer { queue: &self.queue }
    }
}

impl Default for SharedLineQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped access to the shared queue with the receive interrupt masked.
pub struct QueueLock<'a, I: RxInterrupt> {
    queue: &'a mut LineQueue,
    irq: &'a mut I,
    was_enabled: bool,
}

impl<I: RxInterrupt> Deref for QueueLock<'_, I> {
    type Target = LineQueue;

    fn deref(&self) -> &LineQueue {
        self.queue
    }
}

impl<I: RxInterrupt> DerefMut for QueueLock<'_, I> {
    fn deref_mut(&mut self) -> &mut LineQueue {
        self.queue
    }
}

impl<I: RxInterrupt> Drop for QueueLock<'_, I> {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        if self.was_enabled {
            self.irq.enable_rx();
        }
    }
}

/// Interrupt-side handle that feeds received bytes into the queue.
pub struct RxProducer<'a> {
    queue: &'a UnsafeCell<LineQueue>,
}

impl RxProducer<'_> {
    /// Latches the overflow flag, e.g. on a hardware overrun.
    pub fn flag_overflow(&mut self) {
        // SAFETY: see `SharedLineQueue::producer`.
        unsafe { (*self.queue.get()).flag_overflow() }
    }
}

impl ByteSink for RxProducer<'_> {
    fn push(&mut self, byte: u8) -> Result<()> {
        // SAFETY: see `SharedLineQueue::producer`.
        unsafe { (*self.queue.get()).push_byte(byte) }
    }
}

// SAFETY: the handle is moved into the interrupt handler's storage once and
// only used from there.
unsafe impl Send for RxProducer<'_> {}
