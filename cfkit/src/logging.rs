//! Sinks for request tracing.
//!
//! Each sink implements [`RequestLoggerOutput`](cfkit_client::RequestLoggerOutput)
//! and is installed as its own [`RequestLogger`](cfkit_client::RequestLogger).

mod file;
mod terminal;

pub use file::FileWriter;
pub use terminal::TerminalDisplay;
