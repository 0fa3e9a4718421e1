//! Fixed-capacity queue of received text lines.
//!
//! The receive interrupt pushes one byte at a time; a line becomes visible to
//! the consumer only once its terminator has been stored. Capacity is counted
//! in complete lines, not bytes.

mod shared;

pub use shared::{QueueLock, RxInterrupt, RxProducer, SharedLineQueue};

use crate::config::{LINE_CAPACITY, LINE_TERMINATOR, QUEUE_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// All slots hold unread lines
    Full,
    /// The slot being filled reached capacity without a terminator
    LineTooLong,
}

pub type Result<T> = core::result::Result<T, QueueError>;

/// Destination for bytes coming out of the receive interrupt.
pub trait ByteSink {
    fn push(&mut self, byte: u8) -> Result<()>;
}

/// One sealed line, terminator included.
#[derive(Clone, Copy)]
pub struct Line {
    bytes: [u8; LINE_CAPACITY],
    len: u8,
}

impl Line {
    pub const EMPTY: Line = Line {
        bytes: [0; LINE_CAPACITY],
        len: 0,
    };

    /// Copies `data` into a line, or `None` if it does not fit in one slot.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() > LINE_CAPACITY {
            return None;
        }
        let mut line = Self::EMPTY;
        line.bytes[..data.len()].copy_from_slice(data);
        line.len = data.len() as u8;
        Some(line)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl core::fmt::Debug for Line {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(text) => f.debug_tuple("Line").field(&text).finish(),
            Err(_) => f.debug_tuple("Line").field(&self.as_bytes()).finish(),
        }
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Line {}

pub struct LineQueue {
    slots: [Line; QUEUE_DEPTH],
    // Oldest sealed line
    front: usize,
    // Slot currently being filled, and its write cursor
    rear: usize,
    cursor: usize,
    count: usize,
    overflowed: bool,
}

impl LineQueue {
    pub const fn new() -> Self {
        Self {
            slots: [Line::EMPTY; QUEUE_DEPTH],
            front: 0,
            rear: 0,
            cursor: 0,
            count: 0,
            overflowed: false,
        }
    }

    /// Empties the queue, clears the overflow latch and zeroes every slot.
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Appends one received byte to the slot being filled.
    ///
    /// A terminator seals the slot and makes it visible to the consumer.
    /// While every slot holds an unread line all bytes are refused, so a
    /// partially received line can never overwrite the front slot. Any
    /// refusal latches the overflow flag.
    pub fn push_byte(&mut self, byte: u8) -> Result<()> {
        if self.count == QUEUE_DEPTH {
            self.overflowed = true;
            return Err(QueueError::Full);
        }

        if self.cursor >= LINE_CAPACITY {
            self.overflowed = true;
            self.cursor = 0;
            return Err(QueueError::LineTooLong);
        }

        let slot = &mut self.slots[self.rear];
        slot.bytes[self.cursor] = byte;
        self.cursor += 1;

        if byte == LINE_TERMINATOR {
            slot.len = self.cursor as u8;
            self.cursor = 0;
            self.rear = (self.rear + 1) % QUEUE_DEPTH;
            self.count += 1;
        }

        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == QUEUE_DEPTH
    }

    /// Number of sealed lines waiting.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether any byte has been refused since the last `init`.
    #[inline]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Marks the stream as broken without storing anything.
    pub fn flag_overflow(&mut self) {
        self.overflowed = true;
    }

    pub fn peek_front(&self) -> Option<&Line> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.front])
        }
    }

    /// Removes the oldest line. Does nothing on an empty queue.
    pub fn pop_front(&mut self) -> Option<Line> {
        if self.is_empty() {
            return None;
        }
        let line = self.slots[self.front];
        self.front = (self.front + 1) % QUEUE_DEPTH;
        self.count -= 1;
        Some(line)
    }
}

impl Default for LineQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSink for LineQueue {
    fn push(&mut self, byte: u8) -> Result<()> {
        self.push_byte(byte)
    }
}
