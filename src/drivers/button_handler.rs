use embedded_hal::digital::v2::InputPin;

use crate::config::BUTTON_DEBOUNCE_SAMPLES;

/// Boot-mode push button, active low.
pub struct Button<P> {
    pin: P,
    debounce_samples: u8,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P) -> Self {
        Self::with_debounce(pin, BUTTON_DEBOUNCE_SAMPLES)
    }

    pub fn with_debounce(pin: P, debounce_samples: u8) -> Self {
        Self {
            pin,
            debounce_samples: debounce_samples.max(1),
        }
    }

    /// Single raw sample. A pin read error counts as released.
    pub fn is_pressed(&self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }

    /// Blocks until the button has read released for enough consecutive
    /// samples. Returns at once if it is not pressed.
    pub fn wait_for_release(&self) {
        let mut released: u8 = 0;
        while released < self.debounce_samples {
            if self.is_pressed() {
                released = 0;
            } else {
                released += 1;
            }
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock, State, Transaction};

    #[test]
    fn low_level_reads_as_pressed() {
        let expectations = [
            Transaction::get(State::Low),
            Transaction::get(State::High),
        ];
        let button = Button::new(Mock::new(&expectations));

        assert!(button.is_pressed());
        assert!(!button.is_pressed());

        button.release().done();
    }

    #[test]
    fn release_needs_consecutive_high_samples() {
        // A bounce back to low restarts the count
        let expectations = [
            Transaction::get(State::Low),
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::High),
        ];
        let button = Button::with_debounce(Mock::new(&expectations), 3);

        button.wait_for_release();

        button.release().done();
    }

    #[test]
    fn released_button_returns_after_debounce_window() {
        let expectations = [
            Transaction::get(State::High),
            Transaction::get(State::High),
        ];
        let button = Button::with_debounce(Mock::new(&expectations), 2);

        button.wait_for_release();

        button.release().done();
    }
}
