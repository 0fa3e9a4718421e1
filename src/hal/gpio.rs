use core::convert::Infallible;

use avr_device::atmega128a::PORTB;
use embedded_hal::digital::v2::InputPin;

// PB0, switch to ground
const BUTTON: u8 = 1 << 0;

fn port() -> &'static avr_device::atmega128a::portb::RegisterBlock {
    // SAFETY: only the button bit is touched, with read-modify-write during
    // start-up before interrupts are enabled.
    unsafe { &*PORTB::ptr() }
}

/// Boot-mode switch: input with the internal pull-up, low when pressed.
pub struct BootButton {
    _private: (),
}

impl BootButton {
    pub fn new() -> Self {
        let p = port();
        p.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !BUTTON) });
        p.portb.modify(|r, w| unsafe { w.bits(r.bits() | BUTTON) });
        // Let the pull-up charge the line before the first sample
        for _ in 0..16 {
            avr_device::asm::nop();
        }
        Self { _private: () }
    }
}

impl Default for BootButton {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPin for BootButton {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(port().pinb.read().bits() & BUTTON != 0)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(port().pinb.read().bits() & BUTTON == 0)
    }
}
