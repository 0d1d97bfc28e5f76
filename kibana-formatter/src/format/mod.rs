/*!
Formatting of raw records into transmittable messages.

The formatter owns the identity of the emitting system (host and
application) and builds a fresh [`Message`] per record, applying field
precedence rules and the transport's length budget along the way.
*/

mod message;
mod record;

pub use self::{
    message::{Message, Scope, VERSION},
    record::{Level, Record},
};

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::{
    diagnostics,
    normalize::{self, Exception, Value},
    Error,
};

metrics! {
    msg,
    msg_truncated,
    field_truncated,
}

/// The transport's ceiling for a short message or a single additional
/// string field, in bytes.
const MAX_LENGTH: usize = 32766;

/// Allowance for protocol padding and metadata around the short message.
const MESSAGE_OVERHEAD: usize = 200;

/**
Configuration for message formatting.
*/
#[derive(Debug, Clone)]
pub struct Config {
    /**
    The identity of the emitting system.
    */
    pub host: String,
    /**
    Application code identifying the emitting application.
    */
    pub app_code: String,
    /**
    Version of the emitting application.
    */
    pub app_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_owned(),
            app_code: String::new(),
            app_version: String::new(),
        }
    }
}

/**
Build a formatter to handle records.
*/
pub fn build(config: Config) -> Format {
    Format::new(config)
}

/**
Format a raw record into a [`Message`].
*/
#[derive(Debug, Clone)]
pub struct Format {
    host: String,
    app_code: String,
    app_version: String,
}

impl Format {
    pub fn new(config: Config) -> Self {
        Format {
            host: config.host,
            app_code: config.app_code,
            app_version: config.app_version,
        }
    }

    /**
    Build a fresh message from a record.

    The record must carry `datetime`, `message`, and `level`; anything
    else is a contract violation. Oversized text is truncated rather
    than rejected, so a returned message is always within the
    transport's budget.
    */
    pub fn format(&self, record: &Record) -> Result<Message, Error> {
        increment!(format.msg);

        let (datetime, text, level) = match (&record.datetime, &record.message, &record.level) {
            (Some(datetime), Some(message), Some(level)) => (datetime, message, level),
            _ => bail!(
                "The record should at least contain datetime, message and level keys, {:?} given",
                record
            ),
        };

        let level_name = record
            .level_name
            .clone()
            .unwrap_or_else(|| level.name().to_owned());

        let mut message = Message::new(&self.host, &self.app_code, &self.app_version);

        message
            .set_timestamp(epoch_seconds(datetime))
            .set_short_message(text.clone())
            .set_level(level_name);

        // The overhead allowance decides whether to truncate, but the
        // truncation itself goes to the full ceiling. The deployed
        // backend expects exactly this accounting.
        let len = MESSAGE_OVERHEAD + text.len() + self.host.len();

        if len > MAX_LENGTH {
            increment!(format.msg_truncated);
            diagnostics::emit_debug("Short message over the transport ceiling, truncating");

            message.set_short_message(truncate(text, MAX_LENGTH));
        }

        if let Some(channel) = &record.channel {
            message.set_facility(channel.clone());
        }

        // Explicitly provided source locations win over anything
        // discovered from exception data later
        let mut extra = record.extra.clone();

        if let Some(line) = take_line(&mut extra) {
            message.set_line(line);
        }

        if let Some(file) = take_file(&mut extra) {
            message.set_file(file);
        }

        for (key, value) in &extra {
            message.set_additional(key, bounded(key, normalize::normalize(value)), Scope::Extra)?;
        }

        for (key, value) in &record.context {
            message.set_additional(
                key,
                bounded(key, normalize::normalize(value)),
                Scope::Context,
            )?;
        }

        if message.file().is_none() {
            if let Some(exception) = context_exception(&record.context) {
                message
                    .set_file(exception.file.clone())
                    .set_line(exception.line);
            }
        }

        Ok(message)
    }
}

fn epoch_seconds(datetime: &DateTime<Utc>) -> f64 {
    datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_micros()) / 1e6
}

// Truncate to at most `max` bytes without splitting a UTF-8 sequence.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

// Additional string fields are budgeted by combined key and value length.
fn bounded(key: &str, value: Json) -> Json {
    match value {
        Json::String(s) if key.len() + s.len() > MAX_LENGTH => {
            increment!(format.field_truncated);
            diagnostics::emit_debug("Additional field over the transport ceiling, truncating");

            Json::String(truncate(&s, MAX_LENGTH).to_owned())
        }
        value => value,
    }
}

fn take_line(extra: &mut Vec<(String, Value)>) -> Option<u32> {
    let index = extra.iter().position(|(key, _)| key == "line")?;

    // An unusable value stays behind as an ordinary additional field
    let line = match &extra[index].1 {
        Value::Int(line) if *line >= 0 => Some(*line as u32),
        Value::String(line) => line.parse().ok(),
        _ => None,
    }?;

    extra.remove(index);

    Some(line)
}

fn take_file(extra: &mut Vec<(String, Value)>) -> Option<String> {
    let index = extra.iter().position(|(key, _)| key == "file")?;

    let file = match &extra[index].1 {
        Value::String(file) => Some(file.clone()),
        _ => None,
    }?;

    extra.remove(index);

    Some(file)
}

fn context_exception(context: &[(String, Value)]) -> Option<&Exception> {
    context.iter().find_map(|(key, value)| match value {
        Value::Exception(exception) if key == "exception" => Some(exception),
        _ => None,
    })
}
