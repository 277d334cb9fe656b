//! JSON for HTML attribute values.
//!
//! Markup renders data for client-side widgets into `data-*` attributes.
//! The attribute may be delimited by either quote character, so both quotes
//! are entity-encoded along with `&`, `<` and `>`. Browsers decode the
//! entities before the script reads the attribute, which hands the widget the
//! original JSON text.

use std::borrow::Cow;

use serde::Serialize;

use crate::json::{DefaultEncoder, Encode, EncodeError, to_json_text};

/// Serialize `value` to JSON, then HTML-escape the JSON text.
///
/// # Examples
///
/// ```
/// use edxkit_escape::escape_jsoon_for_html;
///
/// let escaped = escape_jsoon_for_html(&("it's", "<b>")).unwrap();
/// assert_eq!(escaped, "[&#34;it&#39;s&#34;, &#34;&lt;b&gt;&#34;]");
/// ```
pub fn escape_jsoon_for_html<T>(value: &T) -> Result<String, EncodeError>
where
    T: Serialize + ?Sized,
{
    escape_jsoon_for_html_with(value, &DefaultEncoder)
}

/// Like [`escape_jsoon_for_html`], with a caller-supplied encoder.
pub fn escape_jsoon_for_html_with<T, E>(value: &T, encoder: &E) -> Result<String, EncodeError>
where
    T: ?Sized,
    E: Encode<T> + ?Sized,
{
    let json = to_json_text(value, encoder)?;
    Ok(escape_html(&json).into_owned())
}

/// Entity-encode `&`, `<`, `>`, `"` and `'`.
///
/// Quotes use numeric entities (`&#34;`, `&#39;`), which every HTML parser
/// understands regardless of doctype.
///
/// Returns `Cow::Borrowed` when the input has nothing to escape.
#[must_use]
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(is_html_special) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + input.len() / 4);
    for c in input.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&#34;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

fn is_html_special(c: char) -> bool {
    matches!(c, '&' | '<' | '>' | '"' | '\'')
}
