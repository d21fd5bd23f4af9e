//! Fingerprint computation for error reports.
//!
//! A fingerprint identifies a class of errors based on:
//! - Exception type
//! - Message
//! - The innermost stack frames (file and line)
//!
//! Reports with the same fingerprint are considered duplicates for rate
//! limiting purposes.
//!
//! The fallback strings and the frame depth below feed directly into the
//! digest. Changing any of them changes every fingerprint.

use crate::domain::event::{ErrorEvent, Frame};
use serde_json::Number;
use sha2::{Digest, Sha256};
use std::fmt;

/// Message used when neither the event nor its exception carries one.
pub const UNKNOWN_MESSAGE: &str = "unknown";

/// Exception type used when the event has no typed exception.
pub const DEFAULT_ERROR_TYPE: &str = "Error";

/// Number of innermost stack frames included in a fingerprint.
pub const STACK_FRAME_DEPTH: usize = 3;

/// Rendered in place of a frame's missing file name.
pub const UNKNOWN_FILENAME: &str = "unknown";

/// Rendered in place of a frame's missing line number.
pub const UNKNOWN_LINENO: u32 = 0;

/// A stable identity for a class of error reports.
///
/// The SHA-256 digest of `type:message:stack`. Displays as a 64 character
/// lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of an event.
    ///
    /// Total over its input: missing fields fall back to [`UNKNOWN_MESSAGE`],
    /// [`DEFAULT_ERROR_TYPE`] and an empty stack signature.
    pub fn of(event: &ErrorEvent) -> Self {
        Self::from_parts(
            error_type(event),
            error_message(event),
            &stack_signature(event),
        )
    }

    /// Compute a fingerprint from already extracted components.
    pub fn from_parts(error_type: &str, message: &str, stack: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(error_type.as_bytes());
        hasher.update(b":");
        hasher.update(message.as_bytes());
        hasher.update(b":");
        hasher.update(stack.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Compute the fingerprint of an event.
///
/// Shorthand for [`Fingerprint::of`].
pub fn fingerprint(event: &ErrorEvent) -> Fingerprint {
    Fingerprint::of(event)
}

// Empty strings fall through to the next source, same as missing ones.
fn non_empty(s: Option<&String>) -> Option<&str> {
    s.map(String::as_str).filter(|s| !s.is_empty())
}

fn error_message(event: &ErrorEvent) -> &str {
    non_empty(event.message.as_ref())
        .or_else(|| non_empty(event.primary_exception().and_then(|e| e.value.as_ref())))
        .unwrap_or(UNKNOWN_MESSAGE)
}

fn error_type(event: &ErrorEvent) -> &str {
    non_empty(event.primary_exception().and_then(|e| e.kind.as_ref()))
        .unwrap_or(DEFAULT_ERROR_TYPE)
}

/// `file:line` of the innermost frames, joined with `|`.
fn stack_signature(event: &ErrorEvent) -> String {
    let frames = event
        .primary_exception()
        .map(|e| e.frames())
        .unwrap_or(&[]);
    let tail = &frames[frames.len().saturating_sub(STACK_FRAME_DEPTH)..];

    tail.iter().map(format_frame).collect::<Vec<_>>().join("|")
}

fn format_frame(frame: &Frame) -> String {
    let lineno = match &frame.lineno {
        Some(n) => format_lineno(n),
        None => UNKNOWN_LINENO.to_string(),
    };
    format!(
        "{}:{}",
        frame.filename.as_deref().unwrap_or(UNKNOWN_FILENAME),
        lineno
    )
}

// Integral floats render without a fraction, so `12.0` and `12` agree.
fn format_lineno(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{Exception, Stacktrace};

    fn type_error(frames: &[(&str, u32)]) -> ErrorEvent {
        let exc = frames
            .iter()
            .fold(Exception::new("TypeError", "x is undefined"), |exc, (f, l)| {
                exc.with_frame(*f, *l)
            });
        ErrorEvent::new().with_exception(exc)
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = type_error(&[("app.js", 10), ("lib.js", 20)]);
        let b = type_error(&[("app.js", 10), ("lib.js", 20)]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_fingerprint_is_sha256_of_components() {
        let event = type_error(&[("app.js", 10), ("lib.js", 20)]);
        let expected = Sha256::digest(b"TypeError:x is undefined:app.js:10|lib.js:20");

        assert_eq!(Fingerprint::of(&event).to_hex(), hex::encode(expected));
    }

    #[test]
    fn test_display_is_fixed_length_hex() {
        let fp = Fingerprint::of(&ErrorEvent::new());
        let rendered = fp.to_string();

        assert_eq!(rendered.len(), 64);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_line_number_changes_fingerprint() {
        let a = type_error(&[("app.js", 10)]);
        let b = type_error(&[("app.js", 11)]);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_filename_changes_fingerprint() {
        let a = type_error(&[("app.js", 10)]);
        let b = type_error(&[("main.js", 10)]);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_stack_depth_changes_fingerprint() {
        let a = type_error(&[("app.js", 10)]);
        let b = type_error(&[("lib.js", 5), ("app.js", 10)]);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_only_last_three_frames_count() {
        let a = type_error(&[("a.js", 1), ("b.js", 2), ("c.js", 3), ("d.js", 4)]);
        let b = type_error(&[("z.js", 99), ("b.js", 2), ("c.js", 3), ("d.js", 4)]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));

        let expected = Fingerprint::from_parts("TypeError", "x is undefined", "b.js:2|c.js:3|d.js:4");
        assert_eq!(Fingerprint::of(&a), expected);
    }

    #[test]
    fn test_empty_event_uses_fallbacks() {
        let expected = Fingerprint::from_parts(DEFAULT_ERROR_TYPE, UNKNOWN_MESSAGE, "");
        assert_eq!(Fingerprint::of(&ErrorEvent::new()), expected);
    }

    #[test]
    fn test_explicit_message_wins_over_exception_value() {
        let event = ErrorEvent::new()
            .with_message("explicit")
            .with_exception(Exception::new("TypeError", "from exception"));

        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts("TypeError", "explicit", "")
        );
    }

    #[test]
    fn test_exception_value_used_without_message() {
        let event = ErrorEvent::new().with_exception(Exception::new("RangeError", "out of range"));
        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts("RangeError", "out of range", "")
        );
    }

    #[test]
    fn test_empty_strings_fall_through() {
        let event = ErrorEvent::new()
            .with_message("")
            .with_exception(Exception::new("", "inner"));

        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts(DEFAULT_ERROR_TYPE, "inner", "")
        );
    }

    #[test]
    fn test_only_first_exception_is_used() {
        let event = ErrorEvent::new()
            .with_exception(Exception::new("TypeError", "first"))
            .with_exception(Exception::new("IoError", "second").with_frame("x.rs", 1));

        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts("TypeError", "first", "")
        );
    }

    #[test]
    fn test_partial_frames_use_placeholders() {
        let exc = Exception {
            kind: None,
            value: None,
            stacktrace: Some(Stacktrace {
                frames: Some(vec![
                    Frame {
                        lineno: Some(Number::from(7u32)),
                        ..Frame::default()
                    },
                    Frame {
                        filename: Some("app.js".into()),
                        ..Frame::default()
                    },
                ]),
                ..Stacktrace::default()
            }),
            ..Exception::default()
        };
        let event = ErrorEvent::new().with_exception(exc);

        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts(DEFAULT_ERROR_TYPE, UNKNOWN_MESSAGE, "unknown:7|app.js:0")
        );
    }

    #[test]
    fn test_any_numeric_lineno_renders_in_stack() {
        use serde_json::json;

        let event: ErrorEvent = serde_json::from_value(json!({
            "exception": { "values": [{
                "type": "TypeError",
                "value": "x is undefined",
                "stacktrace": { "frames": [
                    { "filename": "a.js", "lineno": -1 },
                    { "filename": "b.js", "lineno": 12.0 },
                    { "filename": "c.js", "lineno": 3.5 }
                ]}
            }]}
        }))
        .unwrap();

        assert_eq!(
            Fingerprint::of(&event),
            Fingerprint::from_parts("TypeError", "x is undefined", "a.js:-1|b.js:12|c.js:3.5")
        );
    }

    #[test]
    fn test_integral_float_lineno_matches_integer() {
        let float_line = |lineno: f64| {
            let mut exc = Exception::new("TypeError", "x is undefined").with_frame("app.js", 0);
            if let Some(frames) = exc.stacktrace.as_mut().and_then(|st| st.frames.as_mut()) {
                frames[0].lineno = Number::from_f64(lineno);
            }
            ErrorEvent::new().with_exception(exc)
        };

        assert_eq!(
            Fingerprint::of(&float_line(12.0)),
            Fingerprint::of(&type_error(&[("app.js", 12)]))
        );
    }
}
