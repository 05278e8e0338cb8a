//! Command handlers for the folio CLI.

pub mod logging;
pub mod serve;
pub mod token;

pub use logging::*;
pub use serve::*;
pub use token::*;
