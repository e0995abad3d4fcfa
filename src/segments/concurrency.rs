//! # Segment capacity.
//!
//! A segment admits up to `n` holders ([`Concurrency::Limited`]) or any number
//! ([`Concurrency::Unbounded`]). The value is parsed from the optional string a
//! pipeline author writes next to the segment name:
//!
//! | Input        | Result                 |
//! |--------------|------------------------|
//! | absent, `""` | `Unbounded`            |
//! | `"3"`        | `Limited(3)`           |
//! | `"0"`, `"x"` | `InvalidConcurrency`   |
//!
//! On disk the value is a plain integer; `Unbounded` is stored as `u32::MAX`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Maximum number of executions allowed to hold a segment at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Concurrency {
    /// At most this many holders. Never zero when built through [`Concurrency::limited`].
    Limited(u32),
    /// No limit: every entrant is admitted immediately.
    #[default]
    Unbounded,
}

impl Concurrency {
    /// Builds a bounded concurrency; `0` is rejected.
    pub fn limited(n: u32) -> Result<Self, GateError> {
        match n {
            0 => Err(GateError::InvalidConcurrency {
                value: n.to_string(),
            }),
            n => Ok(Self::from(n)),
        }
    }

    /// True if a segment currently holding `holding` executions has room for one more.
    #[inline]
    pub fn admits(&self, holding: usize) -> bool {
        match self {
            Concurrency::Limited(n) => holding < *n as usize,
            Concurrency::Unbounded => true,
        }
    }

    /// Returns the limit as an `Option` (`None` = unbounded).
    #[inline]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Concurrency::Limited(n) => Some(*n),
            Concurrency::Unbounded => None,
        }
    }
}

impl From<u32> for Concurrency {
    fn from(n: u32) -> Self {
        if n == u32::MAX {
            Concurrency::Unbounded
        } else {
            Concurrency::Limited(n)
        }
    }
}

impl From<Concurrency> for u32 {
    fn from(c: Concurrency) -> Self {
        c.limit().unwrap_or(u32::MAX)
    }
}

impl FromStr for Concurrency {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Concurrency::Unbounded);
        }
        let n = s.parse::<u32>().map_err(|_| GateError::InvalidConcurrency {
            value: s.to_string(),
        })?;
        Concurrency::limited(n)
    }
}

/// Unbounded renders as an empty string, matching the parser's input.
impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Limited(n) => write!(f, "{n}"),
            Concurrency::Unbounded => Ok(()),
        }
    }
}
