//! License record as stored in the remote document
//!
//! Field names on the wire are `username, password, hwid, blacklist,
//! validity, bind_date`. The blacklist flag is written as `0`/`1`. Fields this
//! crate does not know about are carried along untouched.
//!
//! Stored values are decoded leniently (`"1"`, `3.9`, `null` and friends), but
//! a known field is only rewritten in canonical form once its decoded value
//! changes. Until then the value read from the document is written back as-is,
//! or left out if it was absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Validity applied on `add` when the requested value does not parse
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// One managed license account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub struct Record {
    pub username: String,

    pub password: String,

    /// Bound hardware id, empty when unbound
    pub hardware_id: String,

    pub blacklisted: bool,

    /// `None` is written as JSON `null`
    pub validity_days: Option<i64>,

    /// Set by the license client when a hardware id is attached
    pub bind_date: String,

    /// Fields written by other tools
    pub extra: Map<String, Value>,

    /// Non-canonical values as read, keyed by wire name
    originals: BTreeMap<&'static str, Original>,
}

/// A known field whose stored form differs from its canonical encoding
#[derive(Debug, Clone, PartialEq)]
struct Original {
    /// `None` when the field was absent
    raw: Option<Value>,
    /// Canonical encoding of the value decoded from `raw`
    decoded: Value,
}

impl Record {
    /// Fresh, unbound, not blacklisted record
    pub fn new(username: impl Into<String>, password: impl Into<String>, validity_days: i64) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hardware_id: String::new(),
            blacklisted: false,
            validity_days: Some(validity_days),
            bind_date: String::new(),
            extra: Map::new(),
            originals: BTreeMap::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.hardware_id.is_empty()
    }

    /// Value to write for a known field
    fn emit(&self, name: &str, canonical: Value) -> Option<Value> {
        match self.originals.get(name) {
            Some(original) if original.decoded == canonical => original.raw.clone(),
            _ => Some(canonical),
        }
    }
}

/// Record as it appears in the document
#[derive(Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    username: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    password: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    hwid: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    blacklist: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    validity: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    bind_date: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Keeps an explicit `null` apart from a missing field
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn decode_text(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn decode_flag(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn decode_validity(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => crate::mutation::parse_int(s),
        _ => None,
    }
}

fn flag_value(flag: bool) -> Value {
    Value::from(u8::from(flag))
}

fn validity_value(days: Option<i64>) -> Value {
    days.map_or(Value::Null, Value::from)
}

fn remember(
    originals: &mut BTreeMap<&'static str, Original>,
    name: &'static str,
    raw: Option<Value>,
    decoded: Value,
) {
    if raw.as_ref() != Some(&decoded) {
        originals.insert(name, Original { raw, decoded });
    }
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        let username = decode_text(wire.username.as_ref());
        let password = decode_text(wire.password.as_ref());
        let hardware_id = decode_text(wire.hwid.as_ref());
        let blacklisted = decode_flag(wire.blacklist.as_ref());
        let validity_days = decode_validity(wire.validity.as_ref());
        let bind_date = decode_text(wire.bind_date.as_ref());

        let mut originals = BTreeMap::new();
        remember(&mut originals, "username", wire.username, Value::from(username.as_str()));
        remember(&mut originals, "password", wire.password, Value::from(password.as_str()));
        remember(&mut originals, "hwid", wire.hwid, Value::from(hardware_id.as_str()));
        remember(&mut originals, "blacklist", wire.blacklist, flag_value(blacklisted));
        remember(&mut originals, "validity", wire.validity, validity_value(validity_days));
        remember(&mut originals, "bind_date", wire.bind_date, Value::from(bind_date.as_str()));

        Self {
            username,
            password,
            hardware_id,
            blacklisted,
            validity_days,
            bind_date,
            extra: wire.extra,
            originals,
        }
    }
}

impl From<Record> for WireRecord {
    fn from(record: Record) -> Self {
        Self {
            username: record.emit("username", Value::from(record.username.as_str())),
            password: record.emit("password", Value::from(record.password.as_str())),
            hwid: record.emit("hwid", Value::from(record.hardware_id.as_str())),
            blacklist: record.emit("blacklist", flag_value(record.blacklisted)),
            validity: record.emit("validity", validity_value(record.validity_days)),
            bind_date: record.emit("bind_date", Value::from(record.bind_date.as_str())),
            extra: record.extra,
        }
    }
}
