//! The per-deposit unit of work

pub mod conversion;
pub mod error;
pub mod setup;

pub use conversion::{ACCEPTED_MESSAGE, ConversionTask, TaskReport};
pub use error::ConversionError;
pub use setup::SetupError;
