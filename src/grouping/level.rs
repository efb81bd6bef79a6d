use serde::{Serialize, Serializer};
use std::fmt;

/// Severity of a ZoneMinder log row.
///
/// ZoneMinder stores severity as a small signed integer where positive values
/// are increasingly verbose debug levels and negative values are increasingly
/// severe problems:
///
/// | stored value | level        |
/// |--------------|--------------|
/// | `1..=9`      | `debug1`..`debug9` |
/// | `0`          | `info`       |
/// | `-1`         | `warning`    |
/// | `-2`         | `error`      |
/// | `-3`         | `fatal`      |
/// | `-4`         | `panic`      |
///
/// Values above 9 clamp to `debug9`. Values below -4 are outside the table
/// and fall back to `debug9`, the least severe numbered debug category, so an
/// unexpected value never produces an unknown label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Debug(u8),
}

impl LogLevel {
    pub const MAX_DEBUG: u8 = 9;
    pub const FLOOR: i64 = -4;

    pub fn from_zm(level: i64) -> Self {
        match level {
            1.. => LogLevel::Debug(level.min(i64::from(Self::MAX_DEBUG)) as u8),
            0 => LogLevel::Info,
            -1 => LogLevel::Warning,
            -2 => LogLevel::Error,
            -3 => LogLevel::Fatal,
            Self::FLOOR => LogLevel::Panic,
            _ => LogLevel::Debug(Self::MAX_DEBUG),
        }
    }

    /// Label value sent to Loki
    pub fn name(&self) -> String {
        match self {
            LogLevel::Debug(n) => format!("debug{n}"),
            LogLevel::Info => "info".to_string(),
            LogLevel::Warning => "warning".to_string(),
            LogLevel::Error => "error".to_string(),
            LogLevel::Fatal => "fatal".to_string(),
            LogLevel::Panic => "panic".to_string(),
        }
    }
}

impl From<i64> for LogLevel {
    fn from(level: i64) -> Self {
        Self::from_zm(level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}
