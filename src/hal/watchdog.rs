use avr_device::atmega128a::{CPU, WDT};

// MCUCSR
const WDRF: u8 = 1 << 3;
// WDTCR
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    #[inline]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Stops a watchdog left running by the application before the reset.
    #[inline]
    pub fn disable(&mut self) {
        avr_device::interrupt::free(|_| unsafe {
            let cpu = &*CPU::ptr();
            cpu.mcucsr.modify(|r, w| w.bits(r.bits() & !WDRF));

            let p = &*WDT::ptr();
            // Timed sequence to disable watchdog
            p.wdtcr.write(|w| w.bits(WDCE | WDE));
            p.wdtcr.write(|w| w.bits(0x00));
        });
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}
