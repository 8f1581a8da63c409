//! Unwrapping of the gzip+base64 strings the live feed sends its data in.

use std::io::Read;

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use flate2::read::GzDecoder;
use serde_json::{Value, json};

use crate::utils::truncate_chars;

/// Base64 of the gzip magic bytes `1f 8b 08`
pub const GZIP_BASE64_PREFIX: &str = "H4sI";

const RAW_PREFIX_CHARS: usize = 60;

// The server isn't consistent about padding.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid gzip data: {0}")]
    Gzip(#[from] std::io::Error),
}

/// Decodes one event argument.
///
/// Strings starting with [`GZIP_BASE64_PREFIX`] are unwrapped and parsed as
/// JSON, falling back to the plain text. A payload that can't be unwrapped
/// becomes `{"__decodeError": .., "rawPrefix": ..}`. Anything else is
/// returned unchanged.
pub fn decode_argument(arg: Value) -> Value {
    let Value::String(s) = &arg else {
        return arg;
    };
    if !s.starts_with(GZIP_BASE64_PREFIX) {
        return arg;
    }

    match gunzip_base64(s) {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(e) => json!({
            "__decodeError": e.to_string(),
            "rawPrefix": format!("{}...", truncate_chars(s, RAW_PREFIX_CHARS)),
        }),
    }
}

pub fn decode_arguments(args: Vec<Value>) -> Vec<Value> {
    args.into_iter().map(decode_argument).collect()
}

fn gunzip_base64(encoded: &str) -> Result<String, DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let compressed = BASE64.decode(compact)?;

    let mut bytes = vec![];
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut bytes)?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
