//! Error event model.
//!
//! Mirrors the payload shape used by common error-tracking clients:
//!
//! ```text
//! { message?, exception?: { values?: [{ type?, value?, stacktrace?: { frames?: [{ filename?, lineno? }] } }] } }
//! ```
//!
//! Every field is optional, and deserialization is lenient: a known field
//! holding a value of the wrong shape (`null`, a number where a string is
//! expected, and so on) is treated as absent. Such values, and every field
//! the throttle does not look at, are kept in `extra` so an event that passes
//! through the throttle is returned intact.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// An error report as handed to the throttle before it is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorEvent {
    /// Explicit event message, if the client set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Exception chain attached to the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionList>,
    /// Everything else in the payload, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Container for the exception values of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Exception>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single exception.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Exception {
    /// Exception type name, e.g. `TypeError`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Exception message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stack trace, outermost frame first and the crashing frame last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stacktrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<Frame>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One stack frame.
///
/// `lineno` is any JSON number, kept as sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Move `key` out of `map` if it parses as `T`.
///
/// A value of the wrong shape stays in `map`, so it still serializes back
/// out, and the typed field reads as absent.
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match T::deserialize(&value) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            map.insert(key.to_owned(), value);
            None
        }
    }
}

impl<'de> Deserialize<'de> for ErrorEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::deserialize(deserializer)?;
        Ok(Self {
            message: take_field(&mut extra, "message"),
            exception: take_field(&mut extra, "exception"),
            extra,
        })
    }
}

impl<'de> Deserialize<'de> for ExceptionList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::deserialize(deserializer)?;
        Ok(Self {
            values: take_field(&mut extra, "values"),
            extra,
        })
    }
}

impl<'de> Deserialize<'de> for Exception {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::deserialize(deserializer)?;
        Ok(Self {
            kind: take_field(&mut extra, "type"),
            value: take_field(&mut extra, "value"),
            stacktrace: take_field(&mut extra, "stacktrace"),
            extra,
        })
    }
}

impl<'de> Deserialize<'de> for Stacktrace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::deserialize(deserializer)?;
        Ok(Self {
            frames: take_field(&mut extra, "frames"),
            extra,
        })
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::deserialize(deserializer)?;
        Ok(Self {
            filename: take_field(&mut extra, "filename"),
            lineno: take_field(&mut extra, "lineno"),
            extra,
        })
    }
}

impl ErrorEvent {
    /// Create an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the explicit event message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.extra.remove("message");
        self.message = Some(message.into());
        self
    }

    /// Append an exception to the event.
    pub fn with_exception(mut self, exception: Exception) -> Self {
        self.extra.remove("exception");
        let list = self.exception.get_or_insert_with(ExceptionList::default);
        list.extra.remove("values");
        list.values.get_or_insert_with(Vec::new).push(exception);
        self
    }

    /// The first exception of the event, which drives fingerprinting.
    pub fn primary_exception(&self) -> Option<&Exception> {
        self.exception
            .as_ref()
            .and_then(|list| list.values.as_deref())
            .and_then(|values| values.first())
    }
}

impl Exception {
    /// Create an exception with a type and a message.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Append a frame to the exception's stack trace.
    pub fn with_frame(mut self, filename: impl Into<String>, lineno: u32) -> Self {
        self.extra.remove("stacktrace");
        let stacktrace = self.stacktrace.get_or_insert_with(Stacktrace::default);
        stacktrace.extra.remove("frames");
        stacktrace
            .frames
            .get_or_insert_with(Vec::new)
            .push(Frame::new(filename, lineno));
        self
    }

    /// Stack frames of this exception, empty if there is no stack trace.
    pub fn frames(&self) -> &[Frame] {
        self.stacktrace
            .as_ref()
            .and_then(|st| st.frames.as_deref())
            .unwrap_or(&[])
    }
}

impl Frame {
    /// Create a frame pointing at a file and line.
    pub fn new(filename: impl Into<String>, lineno: u32) -> Self {
        Self {
            filename: Some(filename.into()),
            lineno: Some(lineno.into()),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_helpers() {
        let event = ErrorEvent::new()
            .with_message("boom")
            .with_exception(Exception::new("TypeError", "x is undefined").with_frame("app.js", 3));

        assert_eq!(event.message.as_deref(), Some("boom"));
        let exc = event.primary_exception().unwrap();
        assert_eq!(exc.kind.as_deref(), Some("TypeError"));
        assert_eq!(exc.frames().len(), 1);
    }

    #[test]
    fn test_deserialize_partial_payload() {
        let event: ErrorEvent = serde_json::from_value(json!({
            "exception": { "values": [{ "type": "RangeError" }] }
        }))
        .unwrap();

        assert!(event.message.is_none());
        let exc = event.primary_exception().unwrap();
        assert_eq!(exc.kind.as_deref(), Some("RangeError"));
        assert!(exc.value.is_none());
        assert!(exc.frames().is_empty());
    }

    #[test]
    fn test_deserialize_empty_object() {
        let event: ErrorEvent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(event, ErrorEvent::new());
        assert!(event.primary_exception().is_none());
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let payload = json!({
            "message": "disk full",
            "event_id": "abc123",
            "tags": { "env": "prod" }
        });
        let event: ErrorEvent = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(event.extra.get("event_id"), Some(&json!("abc123")));
        assert_eq!(serde_json::to_value(&event).unwrap(), payload);
    }

    #[test]
    fn test_wrong_shapes_read_as_absent() {
        let event: ErrorEvent = serde_json::from_value(json!({
            "message": 42,
            "exception": { "values": [{
                "type": null,
                "value": "x is undefined",
                "stacktrace": { "frames": null }
            }]}
        }))
        .unwrap();

        assert!(event.message.is_none());
        let exc = event.primary_exception().unwrap();
        assert!(exc.kind.is_none());
        assert_eq!(exc.value.as_deref(), Some("x is undefined"));
        assert!(exc.frames().is_empty());
    }

    #[test]
    fn test_null_exception_values() {
        let event: ErrorEvent =
            serde_json::from_value(json!({ "exception": { "values": null } })).unwrap();
        assert!(event.primary_exception().is_none());

        let event: ErrorEvent = serde_json::from_value(json!({ "exception": null })).unwrap();
        assert!(event.exception.is_none());
    }

    #[test]
    fn test_any_numeric_lineno() {
        let event: ErrorEvent = serde_json::from_value(json!({
            "exception": { "values": [{ "stacktrace": { "frames": [
                { "filename": "a.js", "lineno": -1 },
                { "filename": "b.js", "lineno": 12.5 },
                { "filename": "c.js", "lineno": "12" }
            ]}}]}
        }))
        .unwrap();

        let frames = event.primary_exception().unwrap().frames();
        assert_eq!(frames[0].lineno, Some(Number::from(-1i64)));
        assert_eq!(frames[1].lineno.as_ref().and_then(Number::as_f64), Some(12.5));
        assert!(frames[2].lineno.is_none());
    }

    #[test]
    fn test_malformed_payload_serializes_back_unchanged() {
        let payload = json!({
            "message": 42,
            "exception": { "values": [{
                "type": "TypeError",
                "value": null,
                "mechanism": { "handled": false },
                "stacktrace": { "frames": [
                    { "filename": "app.js", "lineno": 12.0, "colno": 4 },
                    { "filename": 7, "lineno": -3 }
                ]}
            }]},
            "level": "error"
        });
        let event: ErrorEvent = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(serde_json::to_value(&event).unwrap(), payload);
    }

    #[test]
    fn test_empty_arrays_serialize_back_unchanged() {
        for payload in [
            json!({ "exception": {} }),
            json!({ "exception": { "values": [] } }),
            json!({ "exception": { "values": [{ "stacktrace": { "frames": [] } }] } }),
        ] {
            let event: ErrorEvent = serde_json::from_value(payload.clone()).unwrap();
            assert!(event.primary_exception().map_or(true, |e| e.frames().is_empty()));
            assert_eq!(serde_json::to_value(&event).unwrap(), payload);
        }
    }
}
