/*!
Validation of built messages.

A message that fails validation is incomplete rather than malformed:
the failure carries a human-readable reason and the caller is expected
to check it before handing the message to a transport. Passing a
message with an unknown protocol version is a programming error, not a
validation failure.
*/

use std::collections::HashSet;

use crate::{format::Message, Error};

/**
The outcome of validating a message.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Validity {
    Valid,
    Invalid { reason: String },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match self {
            Validity::Valid => true,
            Validity::Invalid { .. } => false,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validity::Valid => None,
            Validity::Invalid { reason } => Some(reason),
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Validity::Invalid {
            reason: reason.into(),
        }
    }
}

/**
Check that a message meets the required shape for its protocol version.
*/
pub fn validate(message: &Message) -> Result<Validity, Error> {
    match message.version() {
        "1.0" => Ok(validate_1_0(message)),
        version => bail!("No validator for message version '{}'", version),
    }
}

// The 1.0 rules layer application identity checks over the 1.1 baseline
fn validate_1_0(message: &Message) -> Validity {
    let baseline = validate_1_1(message);

    if !baseline.is_valid() {
        return baseline;
    }

    if message.app_code().is_empty() {
        return Validity::fail("Application code not set");
    }

    if message.app_version().is_empty() {
        return Validity::fail("Application version not set");
    }

    Validity::Valid
}

fn validate_1_1(message: &Message) -> Validity {
    match message.short_message() {
        Some(short_message) if !short_message.is_empty() => {}
        _ => return Validity::fail("Short message not set"),
    }

    if let Some(level) = message.level() {
        if !is_recognized_level(level) {
            return Validity::fail(format!("Level '{}' is not a valid severity", level));
        }
    }

    if message.timestamp().is_none() {
        return Validity::fail("Timestamp not set");
    }

    Validity::Valid
}

lazy_static! {
    // Syslog severity names and their common long aliases
    static ref SEVERITIES: HashSet<&'static str> = [
        "emerg",
        "emergency",
        "panic",
        "alert",
        "crit",
        "critical",
        "err",
        "error",
        "warning",
        "warn",
        "notice",
        "info",
        "informational",
        "debug",
    ]
    .iter()
    .cloned()
    .collect();
}

fn is_recognized_level(level: &str) -> bool {
    SEVERITIES.contains(level.to_ascii_lowercase().as_str())
}
