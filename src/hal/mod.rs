//! ATmega128A board support. Only built for the AVR target.

pub mod flash;
pub mod gpio;
pub mod uart;
pub mod watchdog;

pub use flash::Spm;
pub use gpio::BootButton;
pub use uart::{RxControl, Tx, Uart0};
pub use watchdog::Watchdog;

use core::arch::asm;

use avr_device::atmega128a::CPU;

use crate::bootloader::Jumper;

// MCUCR
const IVCE: u8 = 1 << 0;
const IVSEL: u8 = 1 << 1;

fn select_vectors(ivsel: u8) {
    avr_device::interrupt::free(|_| unsafe {
        let mcucr = &(*CPU::ptr()).mcucr;
        // IVSEL must be written within four cycles of IVCE
        mcucr.write(|w| w.bits(IVCE));
        mcucr.write(|w| w.bits(ivsel));
    });
}

/// Serve interrupts from the boot section's vector table.
pub fn use_boot_vectors() {
    select_vectors(IVSEL);
}

pub fn use_application_vectors() {
    select_vectors(0);
}

/// Leaves the bootloader with the board as the application expects it after
/// reset: interrupts off, UART off, vectors at address zero.
pub struct BootJumper;

impl Jumper for BootJumper {
    fn jump(&self, address: u32) -> ! {
        avr_device::interrupt::disable();
        uart::shutdown();
        use_application_vectors();

        // SAFETY: `address` is the application's reset vector; nothing of
        // the bootloader is used after this point.
        unsafe {
            // Z holds a word address
            asm!(
                "ijmp",
                in("Z") (address >> 1) as u16,
                options(noreturn),
            );
        }
    }
}
