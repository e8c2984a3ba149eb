pub mod lcd;
pub mod presenter;

pub use lcd::{Lcd, TextSurface};
pub use presenter::{ClockColor, DisplayPresenter, LcdPresenter};
