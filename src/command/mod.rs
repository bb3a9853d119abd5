//! Chat commands
//!
//! - `parser`: text to [`Command`] classification and argument validation
//! - `dispatcher`: event loop that acknowledges and runs commands

pub mod dispatcher;
pub mod parser;

pub use dispatcher::Dispatcher;
