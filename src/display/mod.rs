pub mod compose;
pub mod frame;
pub mod layout;

pub use compose::Composer;
pub use frame::Frame;

use crate::Result;

/// A physical (or fake) panel that shows whole frames.
pub trait Panel {
    /// (Re)send the power-up sequence.
    fn init(&mut self) -> Result<()>;
    /// Push one composed frame to the glass.
    fn present(&mut self, frame: &Frame) -> Result<()>;
    /// Blank the panel before exit.
    fn power_off(&mut self) -> Result<()>;
}
