use std::{
    fmt::Display,
    sync::atomic::{AtomicUsize, Ordering},
};

use chrono::{DateTime, Utc};

/**
Declare counters for the enclosing module.

Counters are bumped through `increment!` and are cheap enough
to leave in place unconditionally.
*/
macro_rules! metrics {
    ($($metric:ident),* $(,)*) => {
        pub(crate) mod metrics {
            #![allow(non_upper_case_globals)]

            use std::sync::atomic::AtomicUsize;

            $(
                pub(crate) static $metric: AtomicUsize = AtomicUsize::new(0);
            )*
        }
    };
}

macro_rules! increment {
    ($module:ident . $metric:ident) => {{
        use std::sync::atomic::Ordering;

        $crate::$module::metrics::$metric.fetch_add(1, Ordering::Relaxed);
    }};
}

/**
The minimum level for self-diagnostic events.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Error = 2,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub min_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_level: Level::Info,
        }
    }
}

static MIN_LEVEL: AtomicUsize = AtomicUsize::new(Level::Info as usize);

pub fn init(config: Config) {
    MIN_LEVEL.store(config.min_level as usize, Ordering::Relaxed);
}

fn enabled(level: Level) -> bool {
    level as usize >= MIN_LEVEL.load(Ordering::Relaxed)
}

#[derive(Serialize)]
struct DiagnosticEvent<'a> {
    #[serde(rename = "@t")]
    timestamp: DateTime<Utc>,

    #[serde(rename = "@l")]
    level: &'static str,

    #[serde(rename = "@mt")]
    message_template: &'static str,

    #[serde(rename = "@x")]
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> DiagnosticEvent<'a> {
    pub fn new(
        level: &'static str,
        error: Option<&'a str>,
        message_template: &'static str,
    ) -> DiagnosticEvent<'a> {
        DiagnosticEvent {
            timestamp: Utc::now(),
            message_template,
            level,
            error,
        }
    }
}

pub fn emit_err(error: &impl Display, message_template: &'static str) {
    if !enabled(Level::Error) {
        return;
    }

    let err_str = format!("{}", error);
    let evt = DiagnosticEvent::new("ERROR", Some(&err_str), message_template);

    emit(&evt);
}

pub fn emit_debug(message_template: &'static str) {
    if !enabled(Level::Debug) {
        return;
    }

    let evt = DiagnosticEvent::new("DEBUG", None, message_template);

    emit(&evt);
}

fn emit(evt: &DiagnosticEvent) {
    let json = serde_json::to_string(evt).expect("infallible JSON");
    eprintln!("{}", json);
}
