//! Compression Module
//!
//! Stream compressors wrapped around the serialization format.

use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};

/// zstd level used when none is configured.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

// == Compression ==
/// Compression applied to encoded payloads. Fixed per codec instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Payload stored as produced by the format
    #[default]
    None,
    /// zstd streaming frames
    Zstd { level: i32 },
}

impl Compression {
    /// zstd at the default level.
    pub fn zstd() -> Self {
        Compression::Zstd {
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Zstd { level } => write!(f, "zstd:{}", level),
        }
    }
}

impl FromStr for Compression {
    type Err = CacheError;

    /// Accepts `none`, `zstd`, or `zstd:<level>`.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.split_once(':') {
            None if lowered == "none" => Ok(Compression::None),
            None if lowered == "zstd" => Ok(Compression::zstd()),
            Some(("zstd", level)) => level
                .parse()
                .map(|level| Compression::Zstd { level })
                .map_err(|_| {
                    CacheError::InvalidArgument(format!("invalid zstd level '{}'", level))
                }),
            _ => Err(CacheError::InvalidArgument(format!(
                "unknown compression '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compression() {
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!("ZSTD".parse::<Compression>().unwrap(), Compression::zstd());
        assert_eq!(
            "zstd:9".parse::<Compression>().unwrap(),
            Compression::Zstd { level: 9 }
        );
        assert!("zstd:high".parse::<Compression>().is_err());
        assert!("snappy".parse::<Compression>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for c in [Compression::None, Compression::Zstd { level: 7 }] {
            assert_eq!(c.to_string().parse::<Compression>().unwrap(), c);
        }
    }
}
