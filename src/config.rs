//! Configuration constants for the ATmega128A bootloader

use crate::drivers::flash::{FlashLayout, FlashRegion};

/// CPU frequency in Hz, taken from `MCU_FREQ_HZ` when the build script sets it
pub const CPU_FREQ_HZ: u32 = parse_hz(option_env!("MCU_FREQ_HZ"), 16_000_000);

/// UART baud rate
pub const UART_BAUD: u32 = 115_200;

/// Number of complete lines the receive queue can hold
pub const QUEUE_DEPTH: usize = 4;

/// Bytes per queue slot, line terminator included
pub const LINE_CAPACITY: usize = 100;

/// Line terminator on the wire
pub const LINE_TERMINATOR: u8 = b'\n';

/// SPM page size in bytes; the erase unit of the on-chip flash
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Start of the boot section (BOOTSZ = 00, 4096 words)
pub const BOOTLOADER_START: u32 = 0x1E000;

/// Application image: 240 pages from the reset vector
pub const APPLICATION: FlashRegion = FlashRegion::new(0x0000, 0xF000);

/// Backup copy of the application taken before every update
pub const BACKUP: FlashRegion = FlashRegion::new(0xF000, 0xF000);

pub const LAYOUT: FlashLayout = FlashLayout::new(APPLICATION, BACKUP, FLASH_PAGE_SIZE);

/// Consecutive released samples before the button counts as released
pub const BUTTON_DEBOUNCE_SAMPLES: u8 = 5;

const _: () = assert!(LAYOUT.is_valid());
const _: () = assert!(BACKUP.end() <= BOOTLOADER_START);
const _: () = assert!(LINE_CAPACITY <= u8::MAX as usize);

const fn parse_hz(value: Option<&str>, default: u32) -> u32 {
    let bytes = match value {
        Some(s) => s.as_bytes(),
        None => return default,
    };
    if bytes.is_empty() {
        return default;
    }

    let mut hz: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if !digit.is_ascii_digit() {
            return default;
        }
        hz = hz * 10 + (digit - b'0') as u32;
        i += 1;
    }
    hz
}
