pub mod button_handler;
pub mod flash;
pub mod serial_console;

pub use button_handler::Button;
pub use flash::{FlashController, FlashError, FlashLayout, FlashRegion, FlashUpdatePort};
pub use serial_console::SerialConsole;
