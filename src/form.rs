//! Form payload decoding.
//!
//! A payload is decoded as a whole before it is split: `+` becomes a space,
//! `%XX` escapes are resolved, and only then is the text cut on `&` and `=`.
//! An escaped `%26` or `%3D` therefore acts as a separator.
//!
//! The raw payload must be UTF-8. Escapes that decode to invalid UTF-8 (a
//! Latin-1 `%E9`, say) become U+FFFD and the record is still stored.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

/// Decoded form fields, ordered by name.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// A `&`-separated pair did not contain exactly one `=`.
    #[error("malformed pair {pair:?}: expected exactly one '='")]
    MalformedPair { pair: String },
}

/// Decodes a raw `k1=v1&k2=v2` payload into fields.
///
/// Returns either the full mapping or the first error. A later occurrence of
/// a key replaces an earlier one.
pub fn decode(payload: &[u8]) -> Result<Fields, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
    let text = unquote_plus(text);

    let mut fields = Fields::new();
    for pair in text.split('&') {
        let mut parts = pair.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                fields.insert(key.to_owned(), value.to_owned());
            }
            _ => return Err(DecodeError::MalformedPair { pair: pair.to_owned() }),
        }
    }
    Ok(fields)
}

fn unquote_plus(text: &str) -> String {
    let spaced = text.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
