use chrono::{DateTime, Utc};

use crate::normalize::Value;

/**
A raw structured log record, as produced by the logging front-end.

`datetime`, `message`, and `level` must be present before the record
can be formatted; everything else is optional.
*/
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    pub datetime: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub level: Option<Level>,
    /// Human-readable severity label. Preferred over `level`
    /// when both are present.
    pub level_name: Option<String>,
    /// The originating subsystem or channel.
    pub channel: Option<String>,
    /// Additional fields in the explicit `extra` namespace.
    pub extra: Vec<(String, Value)>,
    /// Additional fields in the default `context` namespace.
    pub context: Vec<(String, Value)>,
}

/**
Record severity, either numeric or symbolic.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Level {
    /// A standard Syslog level, 0 through 7.
    Numeric(u8),
    Named(String),
}

impl Level {
    pub fn name(&self) -> &str {
        match self {
            Level::Numeric(0) => "emerg",
            Level::Numeric(1) => "alert",
            Level::Numeric(2) => "crit",
            Level::Numeric(3) => "err",
            Level::Numeric(4) => "warning",
            Level::Numeric(5) => "notice",
            Level::Numeric(6) => "info",
            Level::Numeric(_) => "debug",
            Level::Named(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_use_the_syslog_names() {
        assert_eq!("emerg", Level::Numeric(0).name());
        assert_eq!("err", Level::Numeric(3).name());
        assert_eq!("debug", Level::Numeric(7).name());

        // Out-of-range levels are clamped to debug
        assert_eq!("debug", Level::Numeric(42).name());
    }

    #[test]
    fn named_levels_pass_through() {
        assert_eq!("ERROR", Level::Named("ERROR".to_owned()).name());
    }
}
