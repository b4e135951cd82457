//! Command handlers
//!
//! This module contains the operations the presentation layer (and the CLI)
//! invoke on the recording library.

pub mod library;
pub mod session;

pub use library::{ExportOutcome, LibraryState};
pub use session::PasswordGate;
