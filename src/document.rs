//! Document codec
//!
//! The document body is a two-space pretty-printed JSON array of records.
//! In transit the contents API carries it base64-encoded, possibly wrapped
//! with line breaks.

use base64::Engine;

use crate::error::Result;
use crate::record::Record;

/// Serialize records into the document body
pub fn to_body(records: &[Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

/// Parse a document body into records
pub fn from_body(body: &[u8]) -> Result<Vec<Record>> {
    Ok(serde_json::from_slice(body)?)
}

/// Encode records as base64 document content
pub fn encode(records: &[Record]) -> Result<String> {
    let body = to_body(records)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(body))
}

/// Decode base64 document content into records
pub fn decode(content: &str) -> Result<Vec<Record>> {
    // GitHub wraps content at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let body = base64::engine::general_purpose::STANDARD.decode(compact)?;
    from_body(&body)
}
