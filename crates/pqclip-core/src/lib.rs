pub mod config;
pub mod error;
pub mod types;

pub use error::{PqclipError, PqclipResult, AUTH_FAILURE_MESSAGE};
pub use types::{FileReport, UserId};
