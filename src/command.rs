//! The line-oriented command language driving an address space.
//!
//! ```text
//! RQ <owner> <size> <F|B|W>   request memory
//! RL <owner>                  release memory
//! C                           compact
//! STAT                        print the status report (also ST)
//! X                           exit (also EX)
//! ```

use alloc::string::{String, ToString};
use core::fmt;
use core::num::NonZeroUsize;
use core::str::FromStr;

use thiserror::Error;

use crate::allocators::Memory;
use crate::error::Error;
use crate::owner::{Owner, OwnerError};
use crate::status::StatusReport;
use crate::strategy::{Strategy, UnknownStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Request {
        owner: Owner,
        size: NonZeroUsize,
        strategy: Strategy,
    },
    Release {
        owner: Owner,
    },
    Compact,
    Status,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no command given")]
    Empty,
    #[error("invalid command {0:?}, please use one of RQ, RL, C, STAT or X")]
    Unknown(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("invalid size {0:?}, expected a positive integer")]
    InvalidSize(String),
    #[error(transparent)]
    InvalidStrategy(#[from] UnknownStrategy),
    #[error(transparent)]
    InvalidOwner(#[from] OwnerError),
    #[error("unexpected argument {0:?}")]
    Trailing(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?;

        let mut next =
            |what: &'static str| words.next().ok_or(ParseError::MissingArgument(what));

        let command = match name {
            "RQ" => {
                let owner = next("process name")?.parse::<Owner>()?;
                let size = next("size")?;
                let size = size
                    .parse::<NonZeroUsize>()
                    .map_err(|_| ParseError::InvalidSize(size.to_string()))?;
                let strategy = next("strategy (F/B/W)")?.parse::<Strategy>()?;
                Command::Request {
                    owner,
                    size,
                    strategy,
                }
            }
            "RL" => Command::Release {
                owner: next("process name")?.parse::<Owner>()?,
            },
            "C" => Command::Compact,
            "STAT" | "ST" => Command::Status,
            "X" | "EX" => Command::Exit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };

        match words.next() {
            Some(extra) => Err(ParseError::Trailing(extra.to_string())),
            None => Ok(command),
        }
    }

    /// Carry out this command against `memory`.
    ///
    /// `Exit` does nothing here; leaving the loop is the caller's business.
    pub fn run<'m>(&self, memory: &'m mut Memory) -> Result<Reply<'m>, Error> {
        let reply = match *self {
            Command::Request {
                owner,
                size,
                strategy,
            } => {
                memory.allocate(owner, size, strategy)?;
                Reply::Allocated {
                    owner,
                    size,
                    strategy,
                }
            }
            Command::Release { owner } => {
                memory.release(&owner)?;
                Reply::Released { owner }
            }
            Command::Compact => {
                memory.compact()?;
                Reply::Compacted
            }
            Command::Status => Reply::Status(memory.status()),
            Command::Exit => Reply::Exiting,
        };
        Ok(reply)
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// What happened when a command ran, ready to be shown to the user.
pub enum Reply<'m> {
    Allocated {
        owner: Owner,
        size: NonZeroUsize,
        strategy: Strategy,
    },
    Released {
        owner: Owner,
    },
    Compacted,
    Status(StatusReport<'m>),
    Exiting,
}

impl fmt::Display for Reply<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Allocated {
                owner,
                size,
                strategy,
            } => write!(
                f,
                "Allocated {} bytes to process '{}' using {} strategy",
                size, owner, strategy
            ),
            Reply::Released { owner } => {
                write!(f, "Successfully released memory for process '{}'", owner)
            }
            Reply::Compacted => write!(f, "Memory compaction completed."),
            Reply::Status(report) => write!(f, "{}", report),
            Reply::Exiting => write!(f, "Exiting."),
        }
    }
}
