//! Chat command grammar.
//!
//! Commands start with `!` and take at most one argument, the first
//! whitespace-delimited token after the command word. Anything else in the
//! message body is ignored.

use thiserror::Error;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start acquiring a torrent from a magnet link.
    Download { magnet: String },
    /// Delete all chunks whose file name starts with the given prefix.
    Flush { prefix: String },
    /// Send a single chunk file back to the requester.
    GetChunk { file_name: String },
    /// List movie titles from the catalog and prompt for a selection.
    ListMovies,
}

/// A command word was recognized but its required argument was missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Please provide a torrent magnet link.")]
    MissingMagnet,
    #[error("Please provide a session key prefix to flush chunks.")]
    MissingPrefix,
    #[error("Please provide the name of the chunk to request.")]
    MissingChunkName,
}

/// Parses a message body into a command.
///
/// Returns `None` when the body is not a command at all (no `!` prefix or an
/// unknown command word), so plain chatter passes through untouched.
pub fn parse(body: &str) -> Option<Result<Command, CommandError>> {
    let trimmed = body.trim();
    let rest = trimmed.strip_prefix('!')?;

    let mut tokens = rest.split_whitespace();
    let word = tokens.next()?;
    let argument = tokens.next();

    match word.to_ascii_lowercase().as_str() {
        "download" => Some(match argument {
            Some(magnet) => Ok(Command::Download {
                magnet: magnet.to_string(),
            }),
            None => Err(CommandError::MissingMagnet),
        }),
        "flush" => Some(match argument {
            Some(prefix) => Ok(Command::Flush {
                prefix: prefix.to_string(),
            }),
            None => Err(CommandError::MissingPrefix),
        }),
        "getchunk" => Some(match argument {
            Some(file_name) => Ok(Command::GetChunk {
                file_name: file_name.to_string(),
            }),
            None => Err(CommandError::MissingChunkName),
        }),
        "listmovies" => Some(Ok(Command::ListMovies)),
        _ => None,
    }
}
