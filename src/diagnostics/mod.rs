//! Per-session counters and error bookkeeping

use crate::bootloader::UpdateError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    /// Lines that passed validation
    pub lines: u32,
    pub data_records: u32,
    pub words_programmed: u32,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    stats: SessionStats,
    last_error: Option<UpdateError>,
    error_count: u16,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            stats: SessionStats {
                lines: 0,
                data_records: 0,
                words_programmed: 0,
            },
            last_error: None,
            error_count: 0,
        }
    }

    pub fn record_line(&mut self) {
        self.stats.lines += 1;
    }

    pub fn record_data(&mut self, words: u32) {
        self.stats.data_records += 1;
        self.stats.words_programmed += words;
    }

    pub fn report_error(&mut self, error: UpdateError) {
        error!("update error: {}", error);
        self.last_error = Some(error);
        self.error_count = self.error_count.saturating_add(1);
    }

    #[inline]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn last_error(&self) -> Option<UpdateError> {
        self.last_error
    }

    pub fn error_count(&self) -> u16 {
        self.error_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SrecError;

    #[test]
    fn counts_accumulate() {
        let mut diag = Diagnostics::new();
        diag.record_line();
        diag.record_line();
        diag.record_data(3);

        assert_eq!(
            diag.stats(),
            SessionStats {
                lines: 2,
                data_records: 1,
                words_programmed: 3,
            }
        );
    }

    #[test]
    fn keeps_the_latest_error() {
        let mut diag = Diagnostics::new();
        diag.report_error(UpdateError::Overflow);
        diag.report_error(UpdateError::Srec(SrecError::Syntax));

        assert_eq!(diag.last_error(), Some(UpdateError::Srec(SrecError::Syntax)));
        assert_eq!(diag.error_count(), 2);
    }
}
