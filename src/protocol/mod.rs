//! S-record wire format.
//!
//! One record per line: `S<type><count:2><address:4/6/8><data:2*n><checksum:2>`,
//! uppercase hex only, terminated by LF (an optional CR before it is ignored).

pub mod hex;
pub mod record;

pub use record::{
    check_byte_count, check_checksum, check_record_type, check_start, check_syntax, content,
    line_length, parse, Record, Words,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SrecError {
    /// A character outside `0-9A-F`, or a line too short to hold a record
    Syntax,
    /// The line does not begin with `S`
    MissingStartMarker,
    ChecksumMismatch,
    /// The declared count disagrees with the digits that follow it
    ByteCountMismatch,
    UnknownRecordType,
}

impl SrecError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SrecError::Syntax => "syntax error",
            SrecError::MissingStartMarker => "missing start marker",
            SrecError::ChecksumMismatch => "checksum mismatch",
            SrecError::ByteCountMismatch => "byte count mismatch",
            SrecError::UnknownRecordType => "unknown record type",
        }
    }
}

impl core::fmt::Display for SrecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = core::result::Result<T, SrecError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordKind {
    /// S0
    Header,
    /// S1, 16-bit address
    Data16,
    /// S2, 24-bit address
    Data24,
    /// S3, 32-bit address
    Data32,
    /// S5
    Count16,
    /// S6
    Count24,
    /// S7
    Start32,
    /// S8
    Start24,
    /// S9
    Start16,
}

impl RecordKind {
    pub const fn from_digit(digit: u8) -> Option<Self> {
        Some(match digit {
            b'0' => RecordKind::Header,
            b'1' => RecordKind::Data16,
            b'2' => RecordKind::Data24,
            b'3' => RecordKind::Data32,
            b'5' => RecordKind::Count16,
            b'6' => RecordKind::Count24,
            b'7' => RecordKind::Start32,
            b'8' => RecordKind::Start24,
            b'9' => RecordKind::Start16,
            _ => return None,
        })
    }

    /// Width of the address field in bytes.
    pub const fn address_width(&self) -> usize {
        match self {
            RecordKind::Header
            | RecordKind::Data16
            | RecordKind::Count16
            | RecordKind::Start16 => 2,
            RecordKind::Data24 | RecordKind::Count24 | RecordKind::Start24 => 3,
            RecordKind::Data32 | RecordKind::Start32 => 4,
        }
    }

    /// Carries bytes to program.
    pub const fn is_data(&self) -> bool {
        matches!(
            self,
            RecordKind::Data16 | RecordKind::Data24 | RecordKind::Data32
        )
    }

    /// Ends the transfer.
    pub const fn is_termination(&self) -> bool {
        matches!(
            self,
            RecordKind::Start32 | RecordKind::Start24 | RecordKind::Start16
        )
    }
}
