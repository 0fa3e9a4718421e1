//! Serial-port S-record bootloader for the ATmega128A.
//!
//! On reset the boot button decides between running the resident application
//! and entering update mode. In update mode S-record lines arrive over USART0,
//! are buffered by the receive interrupt into a [`queue::LineQueue`], validated
//! by [`protocol`], and programmed into the application region. The previous
//! application is copied to a backup region first and restored if anything
//! goes wrong.
//!
//! Everything except [`hal`] is hardware-agnostic and runs on the host.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(feature = "atmega128", target_arch = "avr"),
    feature(abi_avr_interrupt, asm_experimental_arch)
)]

#[macro_use]
mod logger;

pub mod bootloader;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod protocol;
pub mod queue;

#[cfg(all(feature = "atmega128", target_arch = "avr"))]
pub mod hal;

#[cfg(test)]
pub(crate) mod testing;

pub use bootloader::{Jumper, State, Step, UpdateError, UpdateSession};
pub use drivers::flash::{FlashController, FlashError, FlashLayout, FlashRegion, FlashUpdatePort};
pub use queue::{ByteSink, Line, LineQueue, QueueError, RxInterrupt, SharedLineQueue};
