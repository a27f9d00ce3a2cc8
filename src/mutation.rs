//! Record mutation engine
//!
//! Pure transformations over the record list. Lookups use the first record
//! whose username matches exactly; a missing target is a no-op so a user
//! removed between page render and submission never fails the operation.
//! Only `add` on an existing username is an error.

use crate::error::MutationError;
use crate::record::{Record, DEFAULT_VALIDITY_DAYS};

/// One admin-requested change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddUser {
        username: String,
        password: String,
        validity: String,
    },
    DeleteUser {
        username: String,
    },
    EditPassword {
        username: String,
        password: String,
    },
    ChangeValidity {
        username: String,
        validity: String,
    },
    ResetHwid {
        username: String,
    },
    ToggleBlacklist {
        username: String,
    },
}

impl Mutation {
    /// Apply this change to a record list
    pub fn apply(&self, records: Vec<Record>) -> Result<Vec<Record>, MutationError> {
        match self {
            Mutation::AddUser {
                username,
                password,
                validity,
            } => add(records, username, password, validity),
            Mutation::DeleteUser { username } => Ok(delete(records, username)),
            Mutation::EditPassword { username, password } => {
                Ok(edit_password(records, username, password))
            }
            Mutation::ChangeValidity { username, validity } => {
                Ok(change_validity(records, username, validity))
            }
            Mutation::ResetHwid { username } => Ok(reset_binding(records, username)),
            Mutation::ToggleBlacklist { username } => Ok(toggle_blacklist(records, username)),
        }
    }

    /// Target username
    pub fn username(&self) -> &str {
        match self {
            Mutation::AddUser { username, .. }
            | Mutation::DeleteUser { username }
            | Mutation::EditPassword { username, .. }
            | Mutation::ChangeValidity { username, .. }
            | Mutation::ResetHwid { username }
            | Mutation::ToggleBlacklist { username } => username,
        }
    }

    /// Short operation name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddUser { .. } => "add-user",
            Mutation::DeleteUser { .. } => "delete-user",
            Mutation::EditPassword { .. } => "edit-password",
            Mutation::ChangeValidity { .. } => "change-validity",
            Mutation::ResetHwid { .. } => "reset-hwid",
            Mutation::ToggleBlacklist { .. } => "toggle-blacklist",
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then decimal digits.
/// Trailing characters are ignored; no digits means no value.
pub fn parse_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn position(records: &[Record], username: &str) -> Option<usize> {
    records.iter().position(|r| r.username == username)
}

fn update_first<F>(mut records: Vec<Record>, username: &str, update: F) -> Vec<Record>
where
    F: FnOnce(&mut Record),
{
    if let Some(idx) = position(&records, username) {
        update(&mut records[idx]);
    }
    records
}

/// Append a new unbound record. Validity falls back to 30 when it does not
/// parse or parses to zero.
pub fn add(
    mut records: Vec<Record>,
    username: &str,
    password: &str,
    validity: &str,
) -> Result<Vec<Record>, MutationError> {
    if position(&records, username).is_some() {
        return Err(MutationError::DuplicateUser(username.to_string()));
    }

    let validity_days = parse_int(validity)
        .filter(|days| *days != 0)
        .unwrap_or(DEFAULT_VALIDITY_DAYS);

    records.push(Record::new(username, password, validity_days));
    Ok(records)
}

/// Remove every record with this username
pub fn delete(mut records: Vec<Record>, username: &str) -> Vec<Record> {
    records.retain(|r| r.username != username);
    records
}

pub fn edit_password(records: Vec<Record>, username: &str, new_password: &str) -> Vec<Record> {
    update_first(records, username, |r| r.password = new_password.to_string())
}

/// Set validity to the parsed value. Unlike `add` there is no fallback: an
/// unparsable value is stored as null.
pub fn change_validity(records: Vec<Record>, username: &str, new_validity: &str) -> Vec<Record> {
    update_first(records, username, |r| r.validity_days = parse_int(new_validity))
}

/// Clear the hardware binding so the license can be attached to a new machine
pub fn reset_binding(records: Vec<Record>, username: &str) -> Vec<Record> {
    update_first(records, username, |r| {
        r.hardware_id.clear();
        r.bind_date.clear();
    })
}

pub fn toggle_blacklist(records: Vec<Record>, username: &str) -> Vec<Record> {
    update_first(records, username, |r| r.blacklisted = !r.blacklisted)
}
