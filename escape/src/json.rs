//! The serialization half of every `escape_jsoon_*` helper.
//!
//! Values are first converted to a [`serde_json::Value`] by an [`Encode`]
//! implementation, then rendered as ASCII-only JSON text. Escaping for the
//! embedding context always runs on that text, never on the raw value.

use std::any;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{Formatter, Serializer};
use thiserror::Error;

/// Failure to turn a value into JSON text.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// serde_json rejected the value (non-string map keys, a failing
    /// `Serialize` impl, ...).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A custom encoder has no encoding for the value.
    #[error("{type_name} is not JSON serializable")]
    Unsupported { type_name: &'static str },
}

impl EncodeError {
    /// Convenience for custom encoders rejecting a value of type `T`.
    #[must_use]
    pub fn unsupported<T: ?Sized>() -> Self {
        Self::Unsupported {
            type_name: any::type_name::<T>(),
        }
    }
}

/// Converts a domain value into a JSON tree.
///
/// This is the hook for values that are not `Serialize`, or that need a
/// different representation when rendered into markup. Whatever the encoder
/// produces is escaped afterwards, so an encoder can rewrite content but can
/// never smuggle raw `<`, `>` or `&` past the escaping step.
pub trait Encode<T: ?Sized> {
    fn encode(&self, value: &T) -> Result<Value, EncodeError>;
}

/// Encodes any `Serialize` value with serde_json's default representation.
///
/// Tuples become arrays, unit becomes `null`, maps need string-like keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoder;

impl<T: Serialize + ?Sized> Encode<T> for DefaultEncoder {
    fn encode(&self, value: &T) -> Result<Value, EncodeError> {
        Ok(serde_json::to_value(value)?)
    }
}

/// Encode `value` and render it as JSON text.
///
/// Layout: `", "` between items, `": "` between a key and its value, object
/// keys sorted, and every character outside printable ASCII written as a
/// lowercase `\uXXXX` escape.
pub(crate) fn to_json_text<T, E>(value: &T, encoder: &E) -> Result<String, EncodeError>
where
    T: ?Sized,
    E: Encode<T> + ?Sized,
{
    let tree = encoder.encode(value)?;
    let mut out = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut out, JsoonFormatter);
    tree.serialize(&mut serializer)?;
    let text = String::from_utf8(out)
        .map_err(|err| serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    tracing::trace!(bytes = text.len(), "encoded value as JSON");
    Ok(text)
}

/// serde_json formatter producing the platform's JSON layout.
struct JsoonFormatter;

impl Formatter for JsoonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    // Quotes, backslashes and C0 controls never reach this method; serde_json
    // routes them through `write_char_escape`.
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if is_printable_ascii(ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}
