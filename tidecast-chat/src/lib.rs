//! Tidecast Chat - Command surface and message routing
//!
//! Parses the `!download` / `!flush` / `!getchunk` / `!listmovies` command
//! grammar, rejects group-addressed commands, and routes direct messages to
//! the acquisition engine, segment delivery and catalog. Includes a console
//! transport for local runs.

pub mod command;
pub mod console;
pub mod router;

// Re-export main types
pub use command::{Command, CommandError};
pub use console::{ConsoleTransport, spawn_stdin_inbox};
pub use router::{ChatRouter, InboundMessage};
