//! Escaping for inline `<script>` blocks.
//!
//! An HTML parser ends a script element at the first `</script`, whatever
//! JavaScript syntax surrounds it, so the escaped output must never contain a
//! literal `<`. `&` and `>` are escaped too, which keeps the output safe in
//! XHTML and inside HTML comments.

use std::fmt::Write;

use serde::Serialize;

use crate::json::{DefaultEncoder, Encode, EncodeError, to_json_text};

/// Serialize `value` to JSON, then replace `&`, `<` and `>` with their
/// `\u0026`, `\u003c` and `\u003e` escapes.
///
/// The result is a JavaScript expression that can be assigned directly:
/// `var data = ${escaped};`.
///
/// # Examples
///
/// ```
/// use edxkit_escape::escape_jsoon_for_js;
///
/// let escaped = escape_jsoon_for_js(&["</script>"]).unwrap();
/// assert_eq!(escaped, r#"["\u003c/script\u003e"]"#);
/// ```
pub fn escape_jsoon_for_js<T>(value: &T) -> Result<String, EncodeError>
where
    T: Serialize + ?Sized,
{
    escape_jsoon_for_js_with(value, &DefaultEncoder)
}

/// Like [`escape_jsoon_for_js`], with a caller-supplied encoder.
pub fn escape_jsoon_for_js_with<T, E>(value: &T, encoder: &E) -> Result<String, EncodeError>
where
    T: ?Sized,
    E: Encode<T> + ?Sized,
{
    let json = to_json_text(value, encoder)?;
    if !json.contains(['&', '<', '>']) {
        return Ok(json);
    }

    let mut result = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        match c {
            '&' => result.push_str("\\u0026"),
            '<' => result.push_str("\\u003c"),
            '>' => result.push_str("\\u003e"),
            _ => result.push(c),
        }
    }
    Ok(result)
}

/// Escape a plain string for use inside a quoted JavaScript string literal.
///
/// No JSON encoding happens here: the caller supplies the quotes. Every
/// character that could end the literal, the surrounding attribute, or the
/// script element is written as an uppercase `\uXXXX` escape. Everything else,
/// non-ASCII included, is kept as is.
///
/// The output is also valid JSON string content, so wrapping it in double
/// quotes and parsing it as JSON yields the input.
#[must_use]
pub fn escape_string_for_js(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for c in input.chars() {
        if needs_js_escape(c) {
            let _ = write!(result, "\\u{:04X}", u32::from(c));
        } else {
            result.push(c);
        }
    }
    result
}

/// Characters that may terminate a JS string, an HTML attribute, or a
/// script element, plus the line terminators JavaScript rejects in literals.
fn needs_js_escape(c: char) -> bool {
    matches!(
        c,
        '\\' | '\'' | '"' | '>' | '<' | '&' | '=' | '-' | ';' | '`' | '\u{2028}' | '\u{2029}'
    ) || c <= '\u{1f}'
}
