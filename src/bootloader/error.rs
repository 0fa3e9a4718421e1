use core::fmt;

use crate::drivers::flash::FlashError;
use crate::protocol::SrecError;
use crate::queue::QueueError;

/// Anything that ends an update session on the failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    /// A byte was refused by the receive queue
    Overflow,
    Srec(SrecError),
    Flash(FlashError),
}

impl From<QueueError> for UpdateError {
    fn from(_: QueueError) -> Self {
        UpdateError::Overflow
    }
}

impl From<SrecError> for UpdateError {
    fn from(err: SrecError) -> Self {
        UpdateError::Srec(err)
    }
}

impl From<FlashError> for UpdateError {
    fn from(err: FlashError) -> Self {
        UpdateError::Flash(err)
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::Overflow => f.write_str("queue overflow"),
            UpdateError::Srec(err) => write!(f, "{}", err),
            UpdateError::Flash(FlashError::Misaligned(addr)) => {
                write!(f, "misaligned address 0x{:X}", addr)
            }
            UpdateError::Flash(FlashError::OutOfRange(addr)) => {
                write!(f, "address 0x{:X} out of range", addr)
            }
            UpdateError::Flash(FlashError::EraseFailed(addr)) => {
                write!(f, "erase failed at 0x{:X}", addr)
            }
            UpdateError::Flash(FlashError::ProgramFailed(addr)) => {
                write!(f, "program failed at 0x{:X}", addr)
            }
        }
    }
}

impl UpdateError {
    /// Flash address involved in the failure, if any.
    pub fn address(&self) -> Option<u32> {
        match *self {
            UpdateError::Flash(
                FlashError::Misaligned(addr)
                | FlashError::OutOfRange(addr)
                | FlashError::EraseFailed(addr)
                | FlashError::ProgramFailed(addr),
            ) => Some(addr),
            _ => None,
        }
    }
}

// Reason only; the console prints the address itself in hex
impl ufmt::uDisplay for UpdateError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(match self {
            UpdateError::Overflow => "queue overflow",
            UpdateError::Srec(err) => err.as_str(),
            UpdateError::Flash(FlashError::Misaligned(_)) => "misaligned address",
            UpdateError::Flash(FlashError::OutOfRange(_)) => "out of range",
            UpdateError::Flash(FlashError::EraseFailed(_)) => "erase failed",
            UpdateError::Flash(FlashError::ProgramFailed(_)) => "program failed",
        })
    }
}
