/*!
A formatter that turns structured log records into size-bounded, GELF-style
messages for a Kibana log-aggregation backend.

The library is split into a few main components, in order of where they appear
in the processing of a log record:

- **Normalize**: Converts arbitrary record values (nested containers, dates,
exceptions, opaque objects) into bounded, serialization-safe JSON.
- **Format**: Builds a `Message` from a raw record. This is where field
precedence rules and length budgets are applied.
- **Validate**: Checks a built message for the required shape before it is
handed off to a transport.
*/

#![deny(unsafe_code)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod diagnostics;

pub mod config;
pub mod format;
pub mod normalize;
pub mod validate;

pub use self::{anyhow::Error, config::Config};
