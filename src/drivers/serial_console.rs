use embedded_hal::serial;

use crate::bootloader::UpdateError;

pub const READY_BANNER: &str = "The bootloader is ready. Please send the application file!\r\n";
pub const SUCCESS_BANNER: &str = "\r\nDone!\r\nPress the switch to enter your application!\r\n";
pub const FAILURE_BANNER: &str =
    "\r\nError!\r\nThe update failed.\r\nPress the switch to enter your previous application!\r\n";

/// Blocking text output over the UART transmitter.
///
/// Write errors are dropped: there is nobody left to report them to.
pub struct SerialConsole<S> {
    tx: S,
}

impl<S: serial::Write<u8>> SerialConsole<S> {
    pub fn new(tx: S) -> Self {
        Self { tx }
    }

    pub fn write_byte(&mut self, byte: u8) {
        nb::block!(self.tx.write(byte)).ok();
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    pub fn write_hex(&mut self, val: u8) {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        self.write_byte(HEX_CHARS[(val >> 4) as usize]);
        self.write_byte(HEX_CHARS[(val & 0xF) as usize]);
    }

    pub fn flush(&mut self) {
        nb::block!(self.tx.flush()).ok();
    }

    pub fn announce_ready(&mut self) {
        self.write_str(READY_BANNER);
        self.flush();
    }

    pub fn announce_success(&mut self) {
        self.write_str(SUCCESS_BANNER);
        self.flush();
    }

    /// Failure banner followed by a one-line reason, with the flash address
    /// in hex when there is one.
    pub fn announce_failure(&mut self, reason: &UpdateError) {
        self.write_str(FAILURE_BANNER);
        ufmt::uwrite!(self, "[ERR] {}", reason).ok();
        if let Some(address) = reason.address() {
            self.write_str(" at 0x");
            for byte in address.to_be_bytes() {
                self.write_hex(byte);
            }
        }
        self.write_str("\r\n");
        self.flush();
    }

    pub fn release(self) -> S {
        self.tx
    }

    #[cfg(test)]
    pub(crate) fn tx(&self) -> &S {
        &self.tx
    }
}

impl<S: serial::Write<u8>> ufmt::uWrite for SerialConsole<S> {
    type Error = core::convert::Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
