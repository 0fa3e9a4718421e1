//! Host-side doubles for the hardware seams.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::v2::InputPin;
use embedded_hal::serial;

use crate::drivers::flash::{FlashController, FlashError, FlashLayout, FlashRegion, Result, ERASED};
use crate::queue::RxInterrupt;

/// Small layout with four 256-byte sectors per region.
pub fn test_layout() -> FlashLayout {
    FlashLayout::new(
        FlashRegion::new(0x0000, 0x400),
        FlashRegion::new(0x0400, 0x400),
        256,
    )
}

/// Builds a well-formed, LF-terminated S-record line.
pub fn srec_line(kind: char, address: u32, data: &[u8]) -> Vec<u8> {
    let width = match kind {
        '0' | '1' | '5' | '9' => 2,
        '2' | '6' | '8' => 3,
        '3' | '7' => 4,
        other => panic!("no address width for S{}", other),
    };

    let mut fields = vec![(width + data.len() + 1) as u8];
    fields.extend_from_slice(&address.to_be_bytes()[4 - width..]);
    fields.extend_from_slice(data);
    let checksum = !fields.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));

    let mut text = format!("S{}", kind);
    for byte in fields.iter().chain(core::iter::once(&checksum)) {
        text.push_str(&format!("{:02X}", byte));
    }
    text.push('\n');
    text.into_bytes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u32),
    Program(u32, [u8; 4]),
}

/// NOR-style flash: erase sets a sector to `0xFF`, programming a word that is
/// not erased fails.
pub struct MockFlash {
    memory: Vec<u8>,
    sector_size: u32,
    pub ops: Vec<FlashOp>,
    pub fail_erase_at: Option<u32>,
    pub fail_program_at: Option<u32>,
}

impl MockFlash {
    pub fn new(layout: FlashLayout) -> Self {
        let top = layout.application.end().max(layout.backup.end());
        Self {
            memory: vec![ERASED; top as usize],
            sector_size: layout.sector_size,
            ops: Vec::new(),
            fail_erase_at: None,
            fail_program_at: None,
        }
    }

    /// Writes bytes directly, bypassing erase rules and the op log.
    pub fn load(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn read(&self, address: u32, len: usize) -> Vec<u8> {
        let start = address as usize;
        self.memory[start..start + len].to_vec()
    }

    pub fn programmed(&self) -> Vec<(u32, [u8; 4])> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                FlashOp::Program(address, word) => Some((address, word)),
                FlashOp::Erase(_) => None,
            })
            .collect()
    }

    pub fn erased(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                FlashOp::Erase(address) => Some(address),
                FlashOp::Program(..) => None,
            })
            .collect()
    }
}

impl FlashController for MockFlash {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn erase_sector(&mut self, address: u32) -> Result<()> {
        if self.fail_erase_at == Some(address) {
            return Err(FlashError::EraseFailed(address));
        }
        let start = address as usize;
        let end = start + self.sector_size as usize;
        if end > self.memory.len() {
            return Err(FlashError::OutOfRange(address));
        }
        self.memory[start..end].fill(ERASED);
        self.ops.push(FlashOp::Erase(address));
        Ok(())
    }

    fn program_word(&mut self, address: u32, word: [u8; 4]) -> Result<()> {
        if self.fail_program_at == Some(address) {
            return Err(FlashError::ProgramFailed(address));
        }
        let start = address as usize;
        let target = self
            .memory
            .get_mut(start..start + 4)
            .ok_or(FlashError::OutOfRange(address))?;
        if target.iter().any(|&b| b != ERASED) {
            return Err(FlashError::ProgramFailed(address));
        }
        target.copy_from_slice(&word);
        self.ops.push(FlashOp::Program(address, word));
        Ok(())
    }

    fn read_word(&mut self, address: u32) -> [u8; 4] {
        let start = address as usize;
        let mut word = [ERASED; 4];
        if let Some(bytes) = self.memory.get(start..start + 4) {
            word.copy_from_slice(bytes);
        }
        word
    }
}

#[derive(Debug, Default)]
pub struct MockRxInterrupt {
    pub enabled: bool,
    pub enables: usize,
    pub disables: usize,
}

impl MockRxInterrupt {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

impl RxInterrupt for MockRxInterrupt {
    fn rx_enabled(&self) -> bool {
        self.enabled
    }

    fn enable_rx(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable_rx(&mut self) {
        self.enabled = false;
        self.disables += 1;
    }
}

/// Serial transmitter that keeps everything written to it.
#[derive(Debug, Default)]
pub struct RecordingSerial {
    pub written: Vec<u8>,
}

impl RecordingSerial {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl serial::Write<u8> for RecordingSerial {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        self.written.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

/// Active-low button that reads as held for a fixed number of samples and
/// released afterwards.
#[derive(Debug)]
pub struct MockButton {
    held_samples: usize,
    pub reads: Cell<usize>,
}

impl MockButton {
    pub fn held_for(samples: usize) -> Self {
        Self {
            held_samples: samples,
            reads: Cell::new(0),
        }
    }

    pub fn released() -> Self {
        Self::held_for(0)
    }

    fn sample_low(&self) -> bool {
        let n = self.reads.get();
        self.reads.set(n + 1);
        n < self.held_samples
    }
}

impl InputPin for MockButton {
    type Error = Infallible;

    fn is_high(&self) -> core::result::Result<bool, Infallible> {
        Ok(!self.sample_low())
    }

    fn is_low(&self) -> core::result::Result<bool, Infallible> {
        Ok(self.sample_low())
    }
}
