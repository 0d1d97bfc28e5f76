use serde_json::{Map, Number, Value as Json};

use crate::Error;

/// The protocol-format tag every message is built with.
pub const VERSION: &str = "1.0";

/**
The namespace an additional field is attached under.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Context,
    Extra,
}

/**
One log event, shaped for transmission.

`host` and `version` are fixed at construction; the remaining fields are
set during formatting and read by the validator and the transport.
*/
#[derive(Debug, Clone)]
pub struct Message {
    host: String,
    version: String,
    app_code: String,
    app_version: String,
    level: Option<String>,
    short_message: Option<String>,
    full_message: Option<String>,
    timestamp: Option<f64>,
    facility: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    context: Map<String, Json>,
    extra: Map<String, Json>,
}

impl Message {
    pub fn new(
        host: impl Into<String>,
        app_code: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Message {
            host: host.into(),
            version: VERSION.to_owned(),
            app_code: app_code.into(),
            app_version: app_version.into(),
            level: None,
            short_message: None,
            full_message: None,
            timestamp: None,
            facility: None,
            file: None,
            line: None,
            context: Map::new(),
            extra: Map::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn app_code(&self) -> &str {
        &self.app_code
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn set_level(&mut self, level: impl Into<String>) -> &mut Self {
        self.level = Some(level.into());
        self
    }

    pub fn short_message(&self) -> Option<&str> {
        self.short_message.as_deref()
    }

    pub fn set_short_message(&mut self, short_message: impl Into<String>) -> &mut Self {
        self.short_message = Some(short_message.into());
        self
    }

    pub fn full_message(&self) -> Option<&str> {
        self.full_message.as_deref()
    }

    pub fn set_full_message(&mut self, full_message: impl Into<String>) -> &mut Self {
        self.full_message = Some(full_message.into());
        self
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: f64) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn facility(&self) -> Option<&str> {
        self.facility.as_deref()
    }

    pub fn set_facility(&mut self, facility: impl Into<String>) -> &mut Self {
        self.facility = Some(facility.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, file: impl Into<String>) -> &mut Self {
        self.file = Some(file.into());
        self
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn set_line(&mut self, line: u32) -> &mut Self {
        self.line = Some(line);
        self
    }

    /**
    Attach an additional field under the given namespace.

    An empty key is a contract violation regardless of namespace.
    */
    pub fn set_additional(
        &mut self,
        key: &str,
        value: Json,
        scope: Scope,
    ) -> Result<&mut Self, Error> {
        if key.is_empty() {
            bail!("Additional field key cannot be empty");
        }

        match scope {
            Scope::Context => self.context.insert(key.to_owned(), value),
            Scope::Extra => self.extra.insert(key.to_owned(), value),
        };

        Ok(self)
    }

    pub fn additionals(&self, scope: Scope) -> &Map<String, Json> {
        match scope {
            Scope::Context => &self.context,
            Scope::Extra => &self.extra,
        }
    }

    /**
    Convert the message into the flat mapping the transport sends.

    Additional fields are prefixed with `_` to keep them clear of the
    core fields. Context fields are written before extra fields, so on a
    cross-namespace key collision the extra value wins. Fields that are
    null, empty strings, or empty containers are omitted; `false` and
    `0` are kept.
    */
    pub fn to_map(&self) -> Map<String, Json> {
        let mut message = Map::new();

        insert_non_empty(&mut message, "app", Json::String(self.app_code.clone()));
        insert_non_empty(
            &mut message,
            "version",
            Json::String(self.app_version.clone()),
        );
        insert_non_empty(&mut message, "format", Json::String(self.version.clone()));
        insert_non_empty(&mut message, "host", Json::String(self.host.clone()));
        insert_non_empty(&mut message, "short_message", string_or_null(&self.short_message));
        insert_non_empty(&mut message, "full_message", string_or_null(&self.full_message));
        insert_non_empty(&mut message, "level", string_or_null(&self.level));
        insert_non_empty(&mut message, "timestamp", number_or_null(self.timestamp));
        insert_non_empty(&mut message, "facility", string_or_null(&self.facility));
        insert_non_empty(&mut message, "file", string_or_null(&self.file));
        insert_non_empty(
            &mut message,
            "line",
            self.line
                .map(|line| Json::Number(Number::from(line)))
                .unwrap_or(Json::Null),
        );

        for (key, value) in self.context.iter().chain(self.extra.iter()) {
            insert_non_empty(&mut message, &format!("_{}", key), value.clone());
        }

        message
    }

    #[cfg(test)]
    pub(crate) fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

fn insert_non_empty(message: &mut Map<String, Json>, key: &str, value: Json) {
    if retained(&value) {
        message.insert(key.to_owned(), value);
    }
}

fn retained(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::String(s) => !s.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(fields) => !fields.is_empty(),
        Json::Bool(_) | Json::Number(_) => true,
    }
}

fn string_or_null(value: &Option<String>) -> Json {
    value
        .as_ref()
        .map(|s| Json::String(s.clone()))
        .unwrap_or(Json::Null)
}

fn number_or_null(value: Option<f64>) -> Json {
    value
        .and_then(Number::from_f64)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}
