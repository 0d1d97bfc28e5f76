/*!
Depth-bounded normalization of raw record values.

Any [`Value`] maps to a JSON tree that is safe to serialize: recursion
stops at a fixed depth, oversized containers are summarized instead of
copied wholesale, and values without a sensible serialized form are
rendered as descriptors rather than dropped.
*/

mod value;

pub use self::value::{Exception, Fault, Frame, Object, ObjectRepr, Value};

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value as Json};

use crate::Error;

metrics! {
    depth_limit,
    item_limit,
}

/// Values nested deeper than this are replaced with a marker.
const MAX_DEPTH: usize = 9;

/// Containers stop normalizing after this many entries.
const MAX_ITEMS: usize = 1000;

const DEPTH_MARKER: &str = "Over 9 levels deep, aborting normalization";

/**
Normalize a raw value into serialization-safe JSON.

Key order in containers is preserved. The result is bounded no matter
how deep or wide the input is.
*/
pub fn normalize(value: &Value) -> Json {
    normalize_at(value, 0)
}

/**
Normalize a throwable into a structured JSON mapping.

Fails when the value is anything other than an exception; callers that
aren't sure what they're holding should go through [`normalize`] instead.
*/
pub fn normalize_exception(value: &Value) -> Result<Json, Error> {
    match value {
        Value::Exception(exception) => Ok(normalize_exception_at(exception, 0)),
        other => bail!("Throwable expected, got {}", other.type_name()),
    }
}

fn normalize_at(value: &Value, depth: usize) -> Json {
    if depth > MAX_DEPTH {
        increment!(normalize.depth_limit);

        return Json::String(DEPTH_MARKER.to_owned());
    }

    match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => Json::Number(Number::from(*v)),
        Value::Float(v) => normalize_float(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::Timestamp(v) => Json::String(format_timestamp(v)),
        Value::Map(entries) => normalize_map(entries, depth),
        Value::Seq(items) => normalize_seq(items, depth),
        Value::Exception(exception) => normalize_exception_at(exception, depth),
        Value::Object(object) => normalize_object(object, depth),
        Value::Resource { kind } => Json::String(format!("[resource] ({})", kind)),
        Value::Unknown { type_name } => Json::String(format!("[unknown({})]", type_name)),
    }
}

fn normalize_float(value: f64) -> Json {
    if value.is_infinite() {
        let rendered = if value > 0.0 { "INF" } else { "-INF" };

        return Json::String(rendered.to_owned());
    }

    if value.is_nan() {
        return Json::String("NaN".to_owned());
    }

    Number::from_f64(value)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

// The `U.u` timestamp format: epoch seconds and a fixed
// six-digit microsecond fraction.
fn format_timestamp(value: &DateTime<Utc>) -> String {
    format!("{}.{:06}", value.timestamp(), value.timestamp_subsec_micros())
}

fn normalize_map(entries: &[(String, Value)], depth: usize) -> Json {
    let mut normalized = Map::new();

    for (processed, (key, value)) in entries.iter().enumerate() {
        if processed >= MAX_ITEMS {
            increment!(normalize.item_limit);

            normalized.insert("...".to_owned(), Json::String(item_marker(entries.len())));
            break;
        }

        normalized.insert(key.clone(), normalize_at(value, depth + 1));
    }

    Json::Object(normalized)
}

fn normalize_seq(items: &[Value], depth: usize) -> Json {
    let mut normalized = Vec::with_capacity(items.len().min(MAX_ITEMS + 1));

    for (processed, value) in items.iter().enumerate() {
        if processed >= MAX_ITEMS {
            increment!(normalize.item_limit);

            normalized.push(Json::String(item_marker(items.len())));
            break;
        }

        normalized.push(normalize_at(value, depth + 1));
    }

    Json::Array(normalized)
}

fn item_marker(total: usize) -> String {
    format!("Over 1000 items ({} total), aborting normalization", total)
}

fn normalize_object(object: &Object, depth: usize) -> Json {
    match &object.repr {
        ObjectRepr::Structured(fields) => {
            let mut normalized = Map::new();

            // The synthetic class name goes first so the object's type
            // survives even when its fields get truncated downstream.
            normalized.insert(
                "class_name".to_owned(),
                Json::String(object.class_name.clone()),
            );

            for (key, value) in fields {
                normalized.insert(key.clone(), normalize_at(value, depth + 1));
            }

            Json::Object(normalized)
        }
        ObjectRepr::Stringified(rendered) => Json::String(rendered.clone()),
        ObjectRepr::Opaque => Json::String(format!("[object] ({})", object.class_name)),
    }
}

fn normalize_exception_at(exception: &Exception, depth: usize) -> Json {
    if depth > MAX_DEPTH {
        increment!(normalize.depth_limit);

        return Json::String(DEPTH_MARKER.to_owned());
    }

    let mut data = Map::new();

    data.insert("class".to_owned(), Json::String(exception.class.clone()));
    data.insert(
        "message".to_owned(),
        Json::String(exception.message.clone()),
    );
    data.insert("code".to_owned(), Json::Number(Number::from(exception.code)));
    data.insert(
        "file".to_owned(),
        Json::String(format!("{}:{}", exception.file, exception.line)),
    );

    if let Some(fault) = &exception.fault {
        if let Some(code) = &fault.code {
            data.insert("faultcode".to_owned(), Json::String(code.clone()));
        }

        if let Some(actor) = &fault.actor {
            data.insert("faultactor".to_owned(), Json::String(actor.clone()));
        }

        if let Some(detail) = &fault.detail {
            data.insert("detail".to_owned(), Json::String(detail.clone()));
        }
    }

    if !exception.trace.is_empty() {
        let trace = exception
            .trace
            .iter()
            .map(|frame| normalize_frame(frame, depth + 1))
            .collect();

        data.insert("trace".to_owned(), Json::Array(trace));
    }

    // The cause chain shares the depth budget, so a pathologically long
    // chain bottoms out at the marker instead of recursing unboundedly.
    if let Some(previous) = &exception.previous {
        data.insert(
            "previous".to_owned(),
            normalize_exception_at(previous, depth + 1),
        );
    }

    Json::Object(data)
}

fn normalize_frame(frame: &Frame, depth: usize) -> Json {
    match frame {
        Frame::Source { file, line } => Json::String(format!("{}:{}", file, line)),
        Frame::Closure => Json::String("{closure}".to_owned()),
        Frame::Call { function, args } => {
            // Objects in argument lists are reduced to their type name so
            // their contents never leak into the log stream.
            let args = args
                .iter()
                .map(|arg| match arg {
                    Value::Object(object) => {
                        Value::String(format!("[object] ({})", object.class_name))
                    }
                    Value::Exception(exception) => {
                        Value::String(format!("[object] ({})", exception.class))
                    }
                    other => other.clone(),
                })
                .collect();

            let call = Value::Map(vec![
                ("function".to_owned(), Value::String(function.clone())),
                ("args".to_owned(), Value::Seq(args)),
            ]);

            normalize_at(&call, depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn scalars_pass_through() {
        assert_eq!(json!(null), normalize(&Value::Null));
        assert_eq!(json!(true), normalize(&Value::Bool(true)));
        assert_eq!(json!(false), normalize(&Value::Bool(false)));
        assert_eq!(json!(-42), normalize(&Value::Int(-42)));
        assert_eq!(json!("payment failed"), normalize(&Value::from("payment failed")));
        assert_eq!(json!(0.5), normalize(&Value::Float(0.5)));
    }

    #[test]
    fn non_finite_floats_are_rendered() {
        assert_eq!(json!("INF"), normalize(&Value::Float(std::f64::INFINITY)));
        assert_eq!(
            json!("-INF"),
            normalize(&Value::Float(std::f64::NEG_INFINITY))
        );
        assert_eq!(json!("NaN"), normalize(&Value::Float(std::f64::NAN)));
    }

    #[test]
    fn timestamps_use_fractional_seconds() {
        let when = Utc
            .timestamp_opt(1385053862, 307_200_000)
            .single()
            .expect("valid timestamp");

        assert_eq!(
            json!("1385053862.307200"),
            normalize(&Value::Timestamp(when))
        );
    }

    #[test]
    fn deep_nesting_is_capped() {
        let mut value = Value::from("bottom");

        for _ in 0..12 {
            value = Value::Map(vec![("inner".to_owned(), value)]);
        }

        let normalized = normalize(&value);

        let mut at = &normalized;
        for _ in 0..10 {
            at = &at["inner"];
        }

        assert_eq!(json!(DEPTH_MARKER), *at);
    }

    #[test]
    fn oversized_maps_are_summarized() {
        let entries = (0..1500)
            .map(|i| (format!("k{}", i), Value::Int(i)))
            .collect();

        let normalized = normalize(&Value::Map(entries));
        let fields = normalized.as_object().expect("expected a map");

        assert_eq!(1001, fields.len());
        assert_eq!(json!(999), fields["k999"]);
        assert!(!fields.contains_key("k1000"));
        assert_eq!(
            json!("Over 1000 items (1500 total), aborting normalization"),
            fields["..."]
        );
    }

    #[test]
    fn oversized_seqs_are_summarized() {
        let items = (0..1500).map(Value::Int).collect();

        let normalized = normalize(&Value::Seq(items));
        let items = normalized.as_array().expect("expected a seq");

        assert_eq!(1001, items.len());
        assert_eq!(
            json!("Over 1000 items (1500 total), aborting normalization"),
            items[1000]
        );
    }

    #[test]
    fn objects_normalize_by_capability() {
        let structured = Value::Object(Object {
            class_name: "App\\User".to_owned(),
            repr: ObjectRepr::Structured(vec![
                ("id".to_owned(), Value::Int(7)),
                ("name".to_owned(), Value::from("ada")),
            ]),
        });

        assert_eq!(
            json!({
                "class_name": "App\\User",
                "id": 7,
                "name": "ada"
            }),
            normalize(&structured)
        );

        let stringified = Value::Object(Object {
            class_name: "App\\UserId".to_owned(),
            repr: ObjectRepr::Stringified("user#7".to_owned()),
        });

        assert_eq!(json!("user#7"), normalize(&stringified));

        let opaque = Value::Object(Object {
            class_name: "App\\Handle".to_owned(),
            repr: ObjectRepr::Opaque,
        });

        assert_eq!(json!("[object] (App\\Handle)"), normalize(&opaque));
    }

    #[test]
    fn resources_and_unknowns_are_described() {
        assert_eq!(
            json!("[resource] (stream)"),
            normalize(&Value::Resource {
                kind: "stream".to_owned()
            })
        );

        assert_eq!(
            json!("[unknown(callable)]"),
            normalize(&Value::Unknown {
                type_name: "callable".to_owned()
            })
        );
    }

    #[test]
    fn exceptions_normalize_to_structured_mappings() {
        let exception = Value::Exception(Exception {
            class: "App\\PaymentError".to_owned(),
            message: "charge declined".to_owned(),
            code: 402,
            file: "/srv/app/payment.rs".to_owned(),
            line: 88,
            trace: vec![
                Frame::Source {
                    file: "/srv/app/payment.rs".to_owned(),
                    line: 88,
                },
                Frame::Closure,
                Frame::Call {
                    function: "App\\Billing::charge".to_owned(),
                    args: vec![
                        Value::Object(Object {
                            class_name: "App\\User".to_owned(),
                            repr: ObjectRepr::Opaque,
                        }),
                        Value::Int(42),
                    ],
                },
            ],
            ..Default::default()
        });

        let expected = json!({
            "class": "App\\PaymentError",
            "message": "charge declined",
            "code": 402,
            "file": "/srv/app/payment.rs:88",
            "trace": [
                "/srv/app/payment.rs:88",
                "{closure}",
                {
                    "function": "App\\Billing::charge",
                    "args": ["[object] (App\\User)", 42]
                }
            ]
        });

        assert_eq!(
            expected,
            normalize_exception(&exception).expect("failed to normalize exception")
        );
    }

    #[test]
    fn fault_details_are_included_when_present() {
        let exception = Value::Exception(Exception {
            class: "SoapFault".to_owned(),
            message: "upstream rejected the call".to_owned(),
            file: "/srv/app/soap.rs".to_owned(),
            line: 12,
            fault: Some(Fault {
                code: Some("Client".to_owned()),
                actor: None,
                detail: Some("missing signature".to_owned()),
            }),
            ..Default::default()
        });

        let expected = json!({
            "class": "SoapFault",
            "message": "upstream rejected the call",
            "code": 0,
            "file": "/srv/app/soap.rs:12",
            "faultcode": "Client",
            "detail": "missing signature"
        });

        assert_eq!(
            expected,
            normalize_exception(&exception).expect("failed to normalize exception")
        );
    }

    #[test]
    fn chained_causes_are_unrolled() {
        let inner = Exception {
            class: "App\\DbError".to_owned(),
            message: "connection reset".to_owned(),
            file: "/srv/app/db.rs".to_owned(),
            line: 3,
            ..Default::default()
        };

        let middle = Exception {
            class: "App\\QueryError".to_owned(),
            message: "query failed".to_owned(),
            file: "/srv/app/query.rs".to_owned(),
            line: 17,
            previous: Some(Box::new(inner)),
            ..Default::default()
        };

        let outer = Value::Exception(Exception {
            class: "App\\PaymentError".to_owned(),
            message: "charge declined".to_owned(),
            file: "/srv/app/payment.rs".to_owned(),
            line: 88,
            previous: Some(Box::new(middle)),
            ..Default::default()
        });

        let normalized = normalize_exception(&outer).expect("failed to normalize exception");

        assert_eq!(json!("App\\QueryError"), normalized["previous"]["class"]);
        assert_eq!(
            json!("App\\DbError"),
            normalized["previous"]["previous"]["class"]
        );
        assert_eq!(
            json!("/srv/app/db.rs:3"),
            normalized["previous"]["previous"]["file"]
        );
    }

    #[test]
    fn long_cause_chains_bottom_out_at_the_depth_marker() {
        let mut exception = Exception {
            class: "App\\Layer0".to_owned(),
            ..Default::default()
        };

        for i in 1..15 {
            exception = Exception {
                class: format!("App\\Layer{}", i),
                previous: Some(Box::new(exception)),
                ..Default::default()
            };
        }

        let normalized = normalize(&Value::Exception(exception));

        let mut at = &normalized;
        for _ in 0..10 {
            at = &at["previous"];
        }

        assert_eq!(json!(DEPTH_MARKER), *at);
    }

    #[test]
    fn normalize_exception_rejects_non_throwables() {
        let err = normalize_exception(&Value::from("not a throwable"))
            .expect_err("expected a contract violation");

        assert!(err.to_string().contains("Throwable expected, got string"));
    }
}
