//! On-chip flash update port.
//!
//! [`FlashController`] is the narrow boundary to the flash command
//! sequencer. [`FlashUpdatePort`] builds the operations the update needs
//! on top of it: region erase, checked word programming, and the
//! region-to-region copy used for backup and restore.

/// Value of an erased flash byte
pub const ERASED: u8 = 0xFF;

const WORD: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Word operation on an address that is not 4-byte aligned
    Misaligned(u32),
    /// Address outside every writable region
    OutOfRange(u32),
    EraseFailed(u32),
    ProgramFailed(u32),
}

pub type Result<T> = core::result::Result<T, FlashError>;

/// Command-level access to the flash controller.
///
/// Every call blocks until the controller has finished the command.
pub trait FlashController {
    /// Erase unit in bytes.
    fn sector_size(&self) -> u32;

    /// Erases the sector starting at `address`. Erasing an erased sector is
    /// harmless.
    fn erase_sector(&mut self, address: u32) -> Result<()>;

    /// Programs one word. `address` is word-aligned and the target is erased.
    fn program_word(&mut self, address: u32, word: [u8; 4]) -> Result<()>;

    fn read_word(&mut self, address: u32) -> [u8; 4];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashRegion {
    pub base: u32,
    pub size: u32,
}

impl FlashRegion {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    #[inline]
    pub const fn end(&self) -> u32 {
        self.base + self.size
    }

    /// Whether `[address, address + len)` lies inside the region.
    pub const fn contains(&self, address: u32, len: u32) -> bool {
        address >= self.base && len <= self.size && address - self.base <= self.size - len
    }

    pub const fn overlaps(&self, other: &FlashRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Whole sectors covered by the region.
    pub const fn sectors(&self, sector_size: u32) -> u32 {
        self.size / sector_size
    }
}

/// Where the application and its backup live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashLayout {
    pub application: FlashRegion,
    pub backup: FlashRegion,
    pub sector_size: u32,
}

impl FlashLayout {
    pub const fn new(application: FlashRegion, backup: FlashRegion, sector_size: u32) -> Self {
        Self {
            application,
            backup,
            sector_size,
        }
    }

    /// Both regions are whole sectors, disjoint, and the backup can hold the
    /// application.
    pub const fn is_valid(&self) -> bool {
        let s = self.sector_size;
        s != 0
            && s % WORD == 0
            && self.application.base % s == 0
            && self.application.size % s == 0
            && self.application.size != 0
            && self.backup.base % s == 0
            && self.backup.size % s == 0
            && self.backup.size >= self.application.size
            && !self.application.overlaps(&self.backup)
    }
}

pub struct FlashUpdatePort<F> {
    flash: F,
    layout: FlashLayout,
}

impl<F: FlashController> FlashUpdatePort<F> {
    pub fn new(flash: F, layout: FlashLayout) -> Self {
        Self { flash, layout }
    }

    #[inline]
    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Erases `count` consecutive sectors from `base`.
    pub fn erase_sectors(&mut self, base: u32, count: u32) -> Result<()> {
        let sector = self.flash.sector_size();
        if base % sector != 0 {
            return Err(FlashError::Misaligned(base));
        }
        self.check_writable(base, count * sector)?;

        for index in 0..count {
            self.flash.erase_sector(base + index * sector)?;
        }
        Ok(())
    }

    pub fn erase_region(&mut self, region: FlashRegion) -> Result<()> {
        let count = region.sectors(self.flash.sector_size());
        self.erase_sectors(region.base, count)
    }

    /// Programs one word inside the application or backup region.
    pub fn program_word(&mut self, address: u32, word: [u8; 4]) -> Result<()> {
        if address % WORD != 0 {
            return Err(FlashError::Misaligned(address));
        }
        self.check_writable(address, WORD)?;
        self.flash.program_word(address, word)
    }

    /// Copies `size` bytes word by word. Erased words are skipped since the
    /// destination is expected to be erased already.
    pub fn copy_region(&mut self, src: u32, dst: u32, size: u32) -> Result<()> {
        if src % WORD != 0 {
            return Err(FlashError::Misaligned(src));
        }
        if dst % WORD != 0 || size % WORD != 0 {
            return Err(FlashError::Misaligned(dst));
        }
        self.check_writable(dst, size)?;

        for offset in (0..size).step_by(WORD as usize) {
            let word = self.flash.read_word(src + offset);
            if word != [ERASED; 4] {
                self.flash.program_word(dst + offset, word)?;
            }
        }
        Ok(())
    }

    /// Replaces the backup with the current application image.
    pub fn backup_application(&mut self) -> Result<()> {
        let FlashLayout {
            application,
            backup,
            ..
        } = self.layout;
        debug!("backing up {} bytes to {}", application.size, backup.base);

        self.erase_region(backup)?;
        self.copy_region(application.base, backup.base, application.size)
    }

    /// Replaces the application with the backup image.
    pub fn restore_application(&mut self) -> Result<()> {
        let FlashLayout {
            application,
            backup,
            ..
        } = self.layout;
        debug!("restoring {} bytes from {}", application.size, backup.base);

        self.erase_region(application)?;
        self.copy_region(backup.base, application.base, application.size)
    }

    #[cfg(test)]
    pub(crate) fn controller(&self) -> &F {
        &self.flash
    }

    fn check_writable(&self, address: u32, len: u32) -> Result<()> {
        if self.layout.application.contains(address, len) || self.layout.backup.contains(address, len)
        {
            Ok(())
        } else {
            Err(FlashError::OutOfRange(address))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_layout, FlashOp, MockFlash};

    fn port() -> FlashUpdatePort<MockFlash> {
        FlashUpdatePort::new(MockFlash::new(test_layout()), test_layout())
    }

    #[test]
    fn region_bounds() {
        let region = FlashRegion::new(0x100, 0x100);

        assert!(region.contains(0x100, 4));
        assert!(region.contains(0x1FC, 4));
        assert!(!region.contains(0x1FE, 4));
        assert!(!region.contains(0xFC, 4));
        assert!(region.contains(0x100, 0x100));
        assert!(!region.contains(0x100, 0x101));
        assert!(region.overlaps(&FlashRegion::new(0x1FF, 1)));
        assert!(!region.overlaps(&FlashRegion::new(0x200, 1)));
    }

    #[test]
    fn layout_validation() {
        let sector = 256;
        let app = FlashRegion::new(0, 0x400);

        assert!(FlashLayout::new(app, FlashRegion::new(0x400, 0x400), sector).is_valid());
        // Overlapping
        assert!(!FlashLayout::new(app, FlashRegion::new(0x300, 0x400), sector).is_valid());
        // Backup too small
        assert!(!FlashLayout::new(app, FlashRegion::new(0x400, 0x300), sector).is_valid());
        // Not sector aligned
        assert!(!FlashLayout::new(app, FlashRegion::new(0x480, 0x400), sector).is_valid());
    }

    #[test]
    fn program_word_rejects_misaligned_address() {
        let mut port = port();
        assert_eq!(
            port.program_word(0x02, [0; 4]),
            Err(FlashError::Misaligned(0x02))
        );
        assert!(port.controller().ops.is_empty());
    }

    #[test]
    fn program_word_rejects_address_outside_regions() {
        let mut port = port();
        let outside = test_layout().backup.end();
        assert_eq!(
            port.program_word(outside, [0; 4]),
            Err(FlashError::OutOfRange(outside))
        );
    }

    #[test]
    fn erase_sectors_walks_each_sector() {
        let mut port = port();
        port.erase_sectors(0x100, 2).unwrap();

        assert_eq!(
            port.controller().ops,
            vec![FlashOp::Erase(0x100), FlashOp::Erase(0x200)]
        );
    }

    #[test]
    fn erase_is_idempotent() {
        let mut port = port();
        port.erase_sectors(0, 1).unwrap();
        port.erase_sectors(0, 1).unwrap();

        assert!(port.controller().read(0, 256).iter().all(|&b| b == ERASED));
    }

    #[test]
    fn copy_region_moves_every_programmed_word() {
        let layout = test_layout();
        let mut flash = MockFlash::new(layout);
        flash.load(layout.application.base, &[1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF, 9, 8, 7, 6]);
        let mut port = FlashUpdatePort::new(flash, layout);

        port.erase_region(layout.backup).unwrap();
        port.copy_region(layout.application.base, layout.backup.base, layout.application.size)
            .unwrap();

        let flash = port.controller();
        assert_eq!(
            flash.read(layout.backup.base, 12),
            vec![1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF, 9, 8, 7, 6]
        );
        // The erased word in between is never programmed
        let programs = flash
            .ops
            .iter()
            .filter(|op| matches!(op, FlashOp::Program(..)))
            .count();
        assert_eq!(programs, 2);
    }

    #[test]
    fn backup_then_restore_round_trips_the_application() {
        let layout = test_layout();
        let image: Vec<u8> = (0..layout.application.size).map(|i| i as u8).collect();
        let mut flash = MockFlash::new(layout);
        flash.load(layout.application.base, &image);
        let mut port = FlashUpdatePort::new(flash, layout);

        port.backup_application().unwrap();
        port.erase_region(layout.application).unwrap();
        port.program_word(layout.application.base, [0xAA; 4]).unwrap();
        port.restore_application().unwrap();

        assert_eq!(
            port.controller().read(layout.application.base, image.len()),
            image
        );
    }

    #[test]
    fn controller_faults_propagate() {
        let layout = test_layout();
        let mut flash = MockFlash::new(layout);
        flash.fail_program_at = Some(layout.application.base + 4);
        let mut port = FlashUpdatePort::new(flash, layout);

        port.program_word(layout.application.base, [0; 4]).unwrap();
        assert_eq!(
            port.program_word(layout.application.base + 4, [0; 4]),
            Err(FlashError::ProgramFailed(layout.application.base + 4))
        );
    }
}
