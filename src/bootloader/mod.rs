//! Update session state machine.
//!
//! One [`UpdateSession`] runs per reset. The boot button decides between
//! starting the resident application and taking a new image over the serial
//! port. The session is polled from the main loop and never blocks except
//! while waiting for the button to be released in the two terminal states.

mod error;


pub use error::UpdateError;

use embedded_hal::digital::v2::InputPin;
use embedded_hal::serial;

use crate::diagnostics::{Diagnostics, SessionStats};
use crate::drivers::flash::{FlashController, FlashError, FlashLayout, FlashUpdatePort};
use crate::drivers::{Button, SerialConsole};
use crate::protocol::{self, Record};
use crate::queue::{Line, RxInterrupt, SharedLineQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Boot decision pending
    Idle,
    /// Waiting for a complete line
    CheckQueue,
    ParseRecord,
    WriteFlash,
    /// Leaving for the application
    JumpToApp,
    /// Failed; the backup is restored before leaving
    Error(UpdateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Mode {
    /// Start the resident application without touching flash
    Normal,
    Update,
}

/// Outcome of one [`UpdateSession::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pending,
    /// The session is over; control goes to the given address.
    Launch(u32),
}

/// Hands control to code at another address.
pub trait Jumper {
    fn jump(&self, address: u32) -> !;
}

pub struct UpdateSession<'q, F, S, B, I> {
    queue: &'q SharedLineQueue,
    flash: FlashUpdatePort<F>,
    console: SerialConsole<S>,
    button: Button<B>,
    rx: I,
    state: State,
    mode: Mode,
    termination_seen: bool,
    // Validated line waiting to be programmed, still at the queue front
    pending: Option<Line>,
    diagnostics: Diagnostics,
}

impl<'q, F, S, B, I> UpdateSession<'q, F, S, B, I>
where
    F: FlashController,
    S: serial::Write<u8>,
    B: InputPin,
    I: RxInterrupt,
{
    pub fn new(
        queue: &'q SharedLineQueue,
        flash: F,
        serial: S,
        button: B,
        rx: I,
        layout: FlashLayout,
    ) -> Self {
        Self {
            queue,
            flash: FlashUpdatePort::new(flash, layout),
            console: SerialConsole::new(serial),
            button: Button::new(button),
            rx,
            state: State::Idle,
            mode: Mode::Normal,
            termination_seen: false,
            pending: None,
            diagnostics: Diagnostics::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.diagnostics.stats()
    }

    pub fn termination_seen(&self) -> bool {
        self.termination_seen
    }

    /// Advances the state machine by one state.
    pub fn poll(&mut self) -> Step {
        let result = match self.state {
            State::Idle => self.decide(),
            State::CheckQueue => self.check_queue(),
            State::ParseRecord => self.parse_record(),
            State::WriteFlash => self.write_flash(),
            State::JumpToApp => return self.finish(),
            State::Error(reason) => return self.recover(reason),
        };

        if let Err(err) = result {
            self.diagnostics.report_error(err);
            self.state = State::Error(err);
        }
        Step::Pending
    }

    /// Polls until the session ends, then jumps.
    pub fn run<J: Jumper>(mut self, jumper: &J) -> ! {
        loop {
            if let Step::Launch(address) = self.poll() {
                jumper.jump(address);
            }
        }
    }

    fn decide(&mut self) -> Result<(), UpdateError> {
        if !self.button.is_pressed() {
            info!("button not pressed, starting application");
            self.state = State::JumpToApp;
            return Ok(());
        }

        info!("entering update mode");
        if let Err(err) = self.flash.backup_application() {
            // The application has not been touched yet; keep running it
            let err = UpdateError::from(err);
            self.diagnostics.report_error(err);
            self.console.announce_failure(&err);
            self.button.wait_for_release();
            self.state = State::JumpToApp;
            return Ok(());
        }

        self.mode = Mode::Update;
        let application = self.flash.layout().application;
        self.flash.erase_region(application)?;

        self.queue.lock(&mut self.rx).init();
        self.rx.enable_rx();
        self.console.announce_ready();
        self.state = State::CheckQueue;
        Ok(())
    }

    fn check_queue(&mut self) -> Result<(), UpdateError> {
        let queue = self.queue.lock(&mut self.rx);
        if queue.overflowed() {
            return Err(UpdateError::Overflow);
        }
        if !queue.is_empty() {
            self.state = State::ParseRecord;
        }
        Ok(())
    }

    fn parse_record(&mut self) -> Result<(), UpdateError> {
        let line = match self.queue.lock(&mut self.rx).peek_front().copied() {
            Some(line) => line,
            None => {
                self.state = State::CheckQueue;
                return Ok(());
            }
        };

        let record = protocol::parse(line.as_bytes())?;
        self.diagnostics.record_line();
        trace!("record {} at {}", record.kind(), record.address());

        if record.kind().is_termination() {
            info!("termination record, entry point {}", record.address());
            self.termination_seen = true;
            self.state = State::JumpToApp;
            return Ok(());
        }

        self.pending = Some(line);
        self.state = State::WriteFlash;
        Ok(())
    }

    fn write_flash(&mut self) -> Result<(), UpdateError> {
        if let Some(line) = self.pending.take() {
            let record = protocol::parse(line.as_bytes())?;
            if let Some(address) = record.load_address() {
                let words = self.program(&record, address)?;
                self.diagnostics.record_data(words);
            }
        }

        self.queue.lock(&mut self.rx).pop_front();
        self.state = State::CheckQueue;
        Ok(())
    }

    fn program(&mut self, record: &Record<'_>, address: u32) -> Result<u32, UpdateError> {
        // Nothing lands in flash, so the address is never checked
        if record.data_len() == 0 {
            return Ok(0);
        }
        if address % 4 != 0 {
            return Err(FlashError::Misaligned(address).into());
        }
        let span = (record.data_len() as u32 + 3) & !3;
        if !self.flash.layout().application.contains(address, span) {
            return Err(FlashError::OutOfRange(address).into());
        }

        let mut target = address;
        for word in record.words() {
            self.flash.program_word(target, word?)?;
            target += 4;
        }
        Ok((target - address) / 4)
    }

    fn finish(&mut self) -> Step {
        if self.mode == Mode::Update {
            self.rx.disable_rx();
            let stats = self.diagnostics.stats();
            info!(
                "update complete: {} lines, {} words",
                stats.lines, stats.words_programmed
            );
            self.console.announce_success();
            self.button.wait_for_release();
        }
        Step::Launch(self.flash.layout().application.base)
    }

    fn recover(&mut self, reason: UpdateError) -> Step {
        self.rx.disable_rx();
        self.console.announce_failure(&reason);
        self.button.wait_for_release();

        warn!("restoring previous application");
        if let Err(err) = self.flash.restore_application() {
            self.diagnostics.report_error(err.into());
        }
        Step::Launch(self.flash.layout().application.base)
    }

    #[cfg(test)]
    pub(crate) fn flash(&self) -> &F {
        self.flash.controller()
    }

    #[cfg(test)]
    pub(crate) fn serial(&self) -> &S {
        self.console.tx()
    }

    #[cfg(test)]
    pub(crate) fn rx(&self) -> &I {
        &self.rx
    }

    #[cfg(test)]
    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
