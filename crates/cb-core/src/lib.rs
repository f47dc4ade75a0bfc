pub mod buttons;
pub mod error;
pub mod messages;
pub mod types;

pub use buttons::{Button, BUTTON_LABELS};
pub use error::{ChatBrainError, ErrorKind};
pub use types::*;
