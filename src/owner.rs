//! Owner labels for allocated blocks.

use core::fmt;
use core::str::FromStr;

use static_assertions::const_assert;
use thiserror::Error;

/// The longest label an allocation may carry, in bytes.
pub const MAX_OWNER_LEN: usize = 9;

// The label length is stored in a single byte.
const_assert!(MAX_OWNER_LEN > 0);
const_assert!(MAX_OWNER_LEN <= u8::MAX as usize);

/// Reasons a string cannot be used as an [`Owner`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnerError {
    #[error("owner name cannot be empty")]
    Empty,
    #[error(
        "owner name is {len} characters long, at most {max} are allowed",
        max = MAX_OWNER_LEN
    )]
    TooLong { len: usize },
    #[error("owner name contains {ch:?}, only printable ASCII characters are allowed")]
    NotPrintable { ch: char },
}

/// The name of the process holding an allocated block.
///
/// An `Owner` is a short string stored inline, so blocks can be copied around
/// freely without touching the heap. It always holds between 1 and
/// [`MAX_OWNER_LEN`] printable, non-space ASCII characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    len: u8,
    bytes: [u8; MAX_OWNER_LEN],
}

impl Owner {
    /// Validate `name` and turn it into an owner label.
    pub fn new(name: &str) -> Result<Owner, OwnerError> {
        if name.is_empty() {
            return Err(OwnerError::Empty);
        }
        if let Some(ch) = name.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(OwnerError::NotPrintable { ch });
        }
        // Only ASCII from here on, so bytes and characters agree.
        if name.len() > MAX_OWNER_LEN {
            return Err(OwnerError::TooLong { len: name.len() });
        }

        let mut bytes = [0; MAX_OWNER_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Owner {
            len: name.len() as u8,
            bytes,
        })
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: `new` only accepts ASCII, which is always valid UTF-8.
        unsafe { core::str::from_utf8_unchecked(&self.bytes[..self.len as usize]) }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromStr for Owner {
    type Err = OwnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Owner::new(s)
    }
}

impl<'a> TryFrom<&'a str> for Owner {
    type Error = OwnerError;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        Owner::new(value)
    }
}

impl AsRef<str> for Owner {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Owner {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Owner {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({:?})", self.as_str())
    }
}
