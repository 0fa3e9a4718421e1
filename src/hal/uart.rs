use core::cell::RefCell;
use core::convert::Infallible;

use avr_device::atmega128a::USART0;
use avr_device::interrupt::Mutex;
use embedded_hal::serial;

use crate::config::CPU_FREQ_HZ;
use crate::queue::{ByteSink, RxInterrupt, RxProducer};

// UCSR0A
const U2X: u8 = 1 << 1;
const DOR: u8 = 1 << 3;
const FE: u8 = 1 << 4;
const UDRE: u8 = 1 << 5;
const TXC: u8 = 1 << 6;
// UCSR0B
const TXEN: u8 = 1 << 3;
const RXEN: u8 = 1 << 4;
const RXCIE: u8 = 1 << 7;
// UCSR0C: asynchronous, 8 data bits, no parity, 1 stop bit
const FORMAT_8N1: u8 = 0x06;

// Where the receive interrupt delivers bytes
static RX_SINK: Mutex<RefCell<Option<RxProducer<'static>>>> = Mutex::new(RefCell::new(None));

/// Double-speed divisor, rounded to nearest.
const fn ubrr(baud: u32) -> u16 {
    ((CPU_FREQ_HZ + 4 * baud) / (8 * baud) - 1) as u16
}

fn usart() -> &'static avr_device::atmega128a::usart0::RegisterBlock {
    // SAFETY: USART0 is owned by this module; register accesses are single
    // byte and the shared ones are done read-modify-write with interrupts off
    // or from the receive handler.
    unsafe { &*USART0::ptr() }
}

/// USART0 configured for 8N1 with the receiver and transmitter enabled.
/// The receive interrupt stays masked until [`RxControl::enable_rx`].
pub struct Uart0 {
    _private: (),
}

impl Uart0 {
    pub fn new(baud: u32) -> Self {
        let divisor = ubrr(baud);
        let p = usart();
        p.ubrr0h.write(|w| unsafe { w.bits((divisor >> 8) as u8) });
        p.ubrr0l.write(|w| unsafe { w.bits(divisor as u8) });
        p.ucsr0a.write(|w| unsafe { w.bits(U2X) });
        p.ucsr0c.write(|w| unsafe { w.bits(FORMAT_8N1) });
        p.ucsr0b.write(|w| unsafe { w.bits(RXEN | TXEN) });

        Self { _private: () }
    }

    pub fn split(self) -> (Tx, RxControl) {
        (Tx { pending: false }, RxControl { _private: () })
    }
}

/// Turns the port off, receive interrupt included.
pub fn shutdown() {
    usart().ucsr0b.write(|w| unsafe { w.bits(0) });
}

/// Routes received bytes into `producer` from now on.
pub fn attach_rx_sink(producer: RxProducer<'static>) {
    avr_device::interrupt::free(|cs| {
        RX_SINK.borrow(cs).replace(Some(producer));
    });
}

pub struct Tx {
    // A byte was written since TXC was last seen
    pending: bool,
}

impl serial::Write<u8> for Tx {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        let p = usart();
        if p.ucsr0a.read().bits() & UDRE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        // Writing TXC clears it
        p.ucsr0a.write(|w| unsafe { w.bits(U2X | TXC) });
        p.udr0.write(|w| unsafe { w.bits(word) });
        self.pending = true;
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.pending && usart().ucsr0a.read().bits() & TXC == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.pending = false;
        Ok(())
    }
}

/// Mask bit for the receive-complete interrupt.
pub struct RxControl {
    _private: (),
}

impl RxInterrupt for RxControl {
    fn rx_enabled(&self) -> bool {
        usart().ucsr0b.read().bits() & RXCIE != 0
    }

    fn enable_rx(&mut self) {
        avr_device::interrupt::free(|_| {
            usart()
                .ucsr0b
                .modify(|r, w| unsafe { w.bits(r.bits() | RXCIE) });
        });
    }

    fn disable_rx(&mut self) {
        avr_device::interrupt::free(|_| {
            usart()
                .ucsr0b
                .modify(|r, w| unsafe { w.bits(r.bits() & !RXCIE) });
        });
    }
}

#[avr_device::interrupt(atmega128a)]
fn USART0_RX() {
    let p = usart();
    // Status must be read before UDR0
    let status = p.ucsr0a.read().bits();
    let byte = p.udr0.read().bits();

    avr_device::interrupt::free(|cs| {
        if let Some(sink) = RX_SINK.borrow(cs).borrow_mut().as_mut() {
            if status & (DOR | FE) != 0 {
                sink.flag_overflow();
            } else {
                // A refused byte latches the queue's overflow flag
                let _ = sink.push(byte);
            }
        }
    });
}
