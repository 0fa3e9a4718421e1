//! Flash self-programming through SPM.
//!
//! The ATmega128A programs whole 256-byte pages through a temporary page
//! buffer. A single word is programmed by filling the buffer with `0xFFFF`
//! everywhere else: writing ones leaves existing cells unchanged, so the rest
//! of the page keeps its contents.
//!
//! All of this must run from the boot section, which is where the linker
//! places the bootloader.

use core::arch::asm;
use core::ptr;

use crate::config::{BOOTLOADER_START, FLASH_PAGE_SIZE};
use crate::drivers::flash::{FlashController, FlashError, Result, ERASED};

// Data-space address of SPMCSR; `sts` reaches it within the four-cycle window
const SPMCSR: *mut u8 = 0x68 as *mut u8;

const SPMEN: u8 = 1 << 0;
const PGERS: u8 = 1 << 1;
const PGWRT: u8 = 1 << 2;
const RWWSRE: u8 = 1 << 4;

/// Issues one SPM command for the page or buffer word at `address`.
///
/// # Safety
/// Interrupts must be disabled and no SPM or EEPROM write may be in progress.
/// Only [`issue`] calls this.
#[inline(always)]
unsafe fn spm(command: u8, address: u32) {
    asm!(
        "out 0x3B, {rampz}",
        "sts 0x68, {cmd}",
        "spm",
        rampz = in(reg) (address >> 16) as u8,
        cmd = in(reg) command,
        in("Z") address as u16,
    );
}

/// Loads one word into the page buffer slot selected by `address`.
#[inline(always)]
unsafe fn fill(address: u32, word: u16) {
    asm!(
        "movw r0, {data}",
        "out 0x3B, {rampz}",
        "sts 0x68, {cmd}",
        "spm",
        "clr r1",
        data = in(reg_pair) word,
        rampz = in(reg) (address >> 16) as u8,
        cmd = in(reg) SPMEN,
        in("Z") address as u16,
    );
}

fn wait_ready() {
    // SAFETY: SPMCSR is a plain I/O register
    while unsafe { ptr::read_volatile(SPMCSR) } & SPMEN != 0 {}
}

/// Waits out the previous command, then issues `command` atomically.
fn issue(command: u8, address: u32) {
    wait_ready();
    avr_device::interrupt::free(|_| {
        // SAFETY: interrupts are off for the four-cycle window and the
        // previous command has finished
        unsafe { spm(command, address) }
    });
}

fn read_byte(address: u32) -> u8 {
    let byte: u8;
    // SAFETY: ELPM only reads program memory
    unsafe {
        asm!(
            "out 0x3B, {rampz}",
            "elpm {out}, Z",
            rampz = in(reg) (address >> 16) as u8,
            out = out(reg) byte,
            in("Z") address as u16,
        );
    }
    byte
}

pub struct Spm {
    _private: (),
}

impl Spm {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn check(address: u32, len: u32) -> Result<()> {
        if address + len > BOOTLOADER_START {
            Err(FlashError::OutOfRange(address))
        } else {
            Ok(())
        }
    }

    /// Runs `command` on the page at `page` and reopens the RWW section.
    ///
    /// Interrupts are masked only around each timed `sts`/`spm` pair. The
    /// receive handler and the vector table live in the boot section, which
    /// stays readable while the RWW section is busy.
    fn page_command(page: u32, command: u8) {
        issue(command | SPMEN, page);
        wait_ready();
        issue(RWWSRE | SPMEN, page);
        wait_ready();
    }
}

impl Default for Spm {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashController for Spm {
    fn sector_size(&self) -> u32 {
        FLASH_PAGE_SIZE
    }

    fn erase_sector(&mut self, address: u32) -> Result<()> {
        Self::check(address, FLASH_PAGE_SIZE)?;
        Self::page_command(address, PGERS);

        if (0..FLASH_PAGE_SIZE).all(|offset| read_byte(address + offset) == ERASED) {
            Ok(())
        } else {
            Err(FlashError::EraseFailed(address))
        }
    }

    fn program_word(&mut self, address: u32, word: [u8; 4]) -> Result<()> {
        Self::check(address, 4)?;
        let page = address & !(FLASH_PAGE_SIZE - 1);

        for offset in (0..FLASH_PAGE_SIZE).step_by(2) {
            let at = page + offset;
            let value = match at.wrapping_sub(address) {
                0 => u16::from_le_bytes([word[0], word[1]]),
                2 => u16::from_le_bytes([word[2], word[3]]),
                _ => 0xFFFF,
            };
            wait_ready();
            avr_device::interrupt::free(|_| {
                // SAFETY: interrupts are off for the timed buffer load
                unsafe { fill(at, value) }
            });
        }
        Self::page_command(page, PGWRT);

        if self.read_word(address) == word {
            Ok(())
        } else {
            Err(FlashError::ProgramFailed(address))
        }
    }

    fn read_word(&mut self, address: u32) -> [u8; 4] {
        [
            read_byte(address),
            read_byte(address + 1),
            read_byte(address + 2),
            read_byte(address + 3),
        ]
    }
}
