//! Validation and decoding of a single S-record line.
//!
//! [`parse`] runs the stages in a fixed order (syntax, start marker,
//! checksum, byte count, record type) and stops at the first failure. Each
//! stage is also exposed on its own. All of them take the raw queued line,
//! terminator included.

use super::{hex, RecordKind, Result, SrecError};
use crate::config::LINE_TERMINATOR;

// `S`, type digit, two count digits, two checksum digits
const MIN_RECORD_LEN: usize = 6;
const COUNT_OFFSET: usize = 2;
const ADDRESS_OFFSET: usize = 4;

/// Bytes up to and including the terminator.
pub fn line_length(line: &[u8]) -> usize {
    match line.iter().position(|&b| b == LINE_TERMINATOR) {
        Some(end) => end + 1,
        None => line.len(),
    }
}

/// The record text with the terminator and an optional preceding CR removed.
pub fn content(line: &[u8]) -> &[u8] {
    let body = match line.iter().position(|&b| b == LINE_TERMINATOR) {
        Some(end) => &line[..end],
        None => line,
    };
    match body {
        [rest @ .., b'\r'] => rest,
        _ => body,
    }
}

fn record_text(line: &[u8]) -> Result<&[u8]> {
    let text = content(line);
    if text.len() < MIN_RECORD_LEN {
        return Err(SrecError::Syntax);
    }
    Ok(text)
}

fn declared_count(text: &[u8]) -> Result<u8> {
    hex::byte(&text[COUNT_OFFSET..]).ok_or(SrecError::Syntax)
}

/// Everything after the start marker must be an uppercase hex digit.
pub fn check_syntax(line: &[u8]) -> Result<()> {
    let text = record_text(line)?;
    if text[1..].iter().all(|&c| hex::is_digit(c)) {
        Ok(())
    } else {
        Err(SrecError::Syntax)
    }
}

pub fn check_start(line: &[u8]) -> Result<()> {
    match content(line).first() {
        Some(b'S') => Ok(()),
        _ => Err(SrecError::MissingStartMarker),
    }
}

/// One's complement of the byte sum from the count field through the last
/// data byte must equal the trailing checksum byte.
pub fn check_checksum(line: &[u8]) -> Result<()> {
    let text = record_text(line)?;
    let checksum_at = text.len() - 2;

    let mut sum: u8 = 0;
    let mut i = COUNT_OFFSET;
    while i + 2 <= checksum_at {
        let byte = hex::byte(&text[i..]).ok_or(SrecError::Syntax)?;
        sum = sum.wrapping_add(byte);
        i += 2;
    }

    let checksum = hex::byte(&text[checksum_at..]).ok_or(SrecError::Syntax)?;
    if !sum == checksum {
        Ok(())
    } else {
        Err(SrecError::ChecksumMismatch)
    }
}

/// The declared count must cover exactly the address, data and checksum
/// digits that follow it.
pub fn check_byte_count(line: &[u8]) -> Result<()> {
    let text = record_text(line)?;
    let declared = declared_count(text)? as usize;
    if declared * 2 == text.len() - ADDRESS_OFFSET {
        Ok(())
    } else {
        Err(SrecError::ByteCountMismatch)
    }
}

/// Classifies the record, and rejects counts too small for its address field.
pub fn check_record_type(line: &[u8]) -> Result<RecordKind> {
    let text = record_text(line)?;
    let kind = RecordKind::from_digit(text[1]).ok_or(SrecError::UnknownRecordType)?;
    let declared = declared_count(text)? as usize;
    if declared < kind.address_width() + 1 {
        return Err(SrecError::ByteCountMismatch);
    }
    Ok(kind)
}

/// Runs every stage and decodes the record.
pub fn parse(line: &[u8]) -> Result<Record<'_>> {
    check_syntax(line)?;
    check_start(line)?;
    check_checksum(line)?;
    check_byte_count(line)?;
    let kind = check_record_type(line)?;

    let text = content(line);
    let data_at = ADDRESS_OFFSET + kind.address_width() * 2;
    let checksum_at = text.len() - 2;

    Ok(Record {
        kind,
        byte_count: declared_count(text)?,
        address: hex::value(&text[ADDRESS_OFFSET..data_at]).ok_or(SrecError::Syntax)?,
        data: &text[data_at..checksum_at],
        checksum: hex::byte(&text[checksum_at..]).ok_or(SrecError::Syntax)?,
    })
}

/// Decoded view of a validated line. Borrows the line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    kind: RecordKind,
    byte_count: u8,
    address: u32,
    // Still hex text
    data: &'a [u8],
    checksum: u8,
}

impl<'a> Record<'a> {
    #[inline]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    #[inline]
    pub fn byte_count(&self) -> u8 {
        self.byte_count
    }

    /// Load address for data records, entry point for termination records.
    #[inline]
    pub fn address(&self) -> u32 {
        self.address
    }

    #[inline]
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Payload as hex digits.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Payload size in bytes.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.data.len() / 2
    }

    /// Where the payload goes, for records that carry one.
    pub fn load_address(&self) -> Option<u32> {
        if self.kind.is_data() {
            Some(self.address)
        } else {
            None
        }
    }

    /// Payload in 4-byte words, in stream order.
    ///
    /// A short final word is padded with `0xFF` so programming it leaves the
    /// remaining erased bytes untouched.
    pub fn words(&self) -> Words<'a> {
        Words { digits: self.data }
    }
}

pub struct Words<'a> {
    digits: &'a [u8],
}

impl Iterator for Words<'_> {
    type Item = Result<[u8; 4]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.digits.is_empty() {
            return None;
        }

        let take = self.digits.len().min(8);
        let (chunk, rest) = self.digits.split_at(take);
        self.digits = rest;

        let mut word = [0xFF; 4];
        for (slot, pair) in word.iter_mut().zip(chunk.chunks(2)) {
            match hex::byte(pair) {
                Some(byte) => *slot = byte,
                None => return Some(Err(SrecError::Syntax)),
            }
        }
        Some(Ok(word))
    }
}
