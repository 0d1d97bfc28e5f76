use chrono::{DateTime, Utc};

/**
A raw value attached to a log record.

Records carry arbitrarily shaped data in their `context` and `extra`
namespaces, so the input to normalization is an explicit tree rather
than plain JSON: dates, exceptions, and opaque application objects all
need their own treatment before they are safe to serialize.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// An ordered key/value container.
    Map(Vec<(String, Value)>),
    /// An ordered sequence. Obeys the same item cap as `Map`.
    Seq(Vec<Value>),
    Exception(Exception),
    Object(Object),
    /// An opaque system resource handle, such as a file descriptor
    /// or a socket.
    Resource { kind: String },
    /// A runtime type the producer couldn't classify.
    Unknown { type_name: String },
}

impl Value {
    /// A stable lowercase tag for error messages and unknown-type markers.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Map(_) => "map",
            Value::Seq(_) => "seq",
            Value::Exception(_) => "exception",
            Value::Object(_) => "object",
            Value::Resource { .. } => "resource",
            Value::Unknown { type_name } => type_name,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

/**
A throwable carried by a record, with its optional chained cause.
*/
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Exception {
    /// The runtime type name of the throwable.
    pub class: String,
    pub message: String,
    pub code: i64,
    /// Source path the throwable was raised from.
    pub file: String,
    pub line: u32,
    /// Protocol-fault details, for SOAP-style faults.
    pub fault: Option<Fault>,
    pub trace: Vec<Frame>,
    pub previous: Option<Box<Exception>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fault {
    pub code: Option<String>,
    pub actor: Option<String>,
    pub detail: Option<String>,
}

/**
A single call-stack frame.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A frame with a known source location.
    Source { file: String, line: u32 },
    /// An anonymous or inline function.
    Closure,
    /// Any other frame, carrying its raw argument list.
    Call { function: String, args: Vec<Value> },
}

/**
An opaque application object.

The representation an object is willing to give up is resolved by the
producer once per type, rather than probed at normalization time.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// The object's runtime type name.
    pub class_name: String,
    pub repr: ObjectRepr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRepr {
    /// The object decomposes into a flat key/value mapping.
    Structured(Vec<(String, Value)>),
    /// The object renders itself as a string.
    Stringified(String),
    /// The object exposes nothing beyond its type.
    Opaque,
}
