#![no_std]
#![no_main]

use panic_halt as _;

use srec_bootloader::config::{LAYOUT, UART_BAUD};
use srec_bootloader::hal::{self, uart, BootButton, BootJumper, Spm, Uart0, Watchdog};
use srec_bootloader::{SharedLineQueue, UpdateSession};

static LINE_QUEUE: SharedLineQueue = SharedLineQueue::new();

#[avr_device::entry]
fn main() -> ! {
    Watchdog::new().disable();
    hal::use_boot_vectors();

    let (tx, rx) = Uart0::new(UART_BAUD).split();
    // SAFETY: the only producer; from here on it is used by the receive
    // interrupt alone
    uart::attach_rx_sink(unsafe { LINE_QUEUE.producer() });

    // The receive interrupt itself stays masked until update mode starts
    unsafe { avr_device::interrupt::enable() };

    let session = UpdateSession::new(&LINE_QUEUE, Spm::new(), tx, BootButton::new(), rx, LAYOUT);
    session.run(&BootJumper)
}
