//! Context-safe JSON for server-rendered markup.
//!
//! Templates hand data to client-side code in two places: `data-*` attribute
//! values and inline `<script>` blocks. Each context has its own metacharacters,
//! so each gets its own helper:
//!
//! - [`escape_jsoon_for_html`]: JSON, then HTML entities. For attribute values.
//! - [`escape_jsoon_for_js`]: JSON, then `\uXXXX` for `&`, `<`, `>`. For script bodies.
//! - [`escape_string_for_js`]: no JSON, every risky character as `\uXXXX`. For
//!   a plain string placed between quotes in a script.
//!
//! The JSON helpers always serialize first and escape the resulting text; the
//! `_with` variants accept an [`Encode`] implementation for values that need a
//! custom representation.

mod html;
mod js;
mod json;

pub use html::{escape_html, escape_jsoon_for_html, escape_jsoon_for_html_with};
pub use js::{escape_jsoon_for_js, escape_jsoon_for_js_with, escape_string_for_js};
pub use json::{DefaultEncoder, Encode, EncodeError};
