//! Structured record version migration.
//!
//! Saved enduros carry a format version. Older records are upgraded with
//! [`upgrade`] before they are deserialized into the current record types.

use serde_json::{Map, Value, json};

/// Errors that can occur during migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
}

/// Upgrades a record from version `from` to version `to`. Returns the
/// record unchanged when the versions match.
pub fn upgrade(record: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
    match (from, to) {
        _ if from == to => Ok(record),
        (1, 2) => v1_to_v2(record),
        _ => Err(MigrationError::NoMigrationPath { from, to }),
    }
}

// ---------------------------------------------------------------------------
// Version 1 -> 2
// ---------------------------------------------------------------------------

/// Version 1 type flags and their version 2 tags.
const V1_TAGS: [(&str, &str); 11] = [
    ("speed", "speedChange"),
    ("reset", "reset"),
    ("resetTo0", "resetToZero"),
    ("freeTime", "freeTime"),
    ("freeZone", "freeZone"),
    ("break", "freeTime"),
    ("gasStop", "gasStop"),
    ("known", "known"),
    ("note", "note"),
    ("start", "start"),
    ("end", "end"),
];

fn v1_failure(reason: impl Into<String>) -> MigrationError {
    MigrationError::MigrationFailed {
        from: 1,
        to: 2,
        reason: reason.into(),
    }
}

/// Version 1 keeps the key time and actions at the top level and tags each
/// action with a `{"<name>": true}` object.
fn v1_to_v2(record: Value) -> Result<Value, MigrationError> {
    let Value::Object(mut root) = record else {
        return Err(v1_failure("record is not an object"));
    };

    let title = root.remove("title").unwrap_or_else(|| json!(""));
    let key_time = root.remove("keyTime").unwrap_or(Value::Null);
    let actions = match root.remove("actions") {
        Some(Value::Array(actions)) => actions,
        Some(_) => return Err(v1_failure("actions is not an array")),
        None => Vec::new(),
    };

    let actions = actions
        .into_iter()
        .enumerate()
        .map(|(index, action)| v1_action(index, action))
        .collect::<Result<Vec<_>, _>>()?;

    let mut route_sheet = Map::new();
    if !key_time.is_null() {
        route_sheet.insert("keyTime".into(), key_time);
    }
    route_sheet.insert("actions".into(), Value::Array(actions));
    if let Some(options) = root.remove("options") {
        route_sheet.insert("options".into(), options);
    }

    Ok(json!({
        "version": "2",
        "title": title,
        "routeSheet": route_sheet,
    }))
}

fn v1_action(index: usize, action: Value) -> Result<Value, MigrationError> {
    let Value::Object(mut fields) = action else {
        return Err(v1_failure(format!("action {index} is not an object")));
    };
    let flags = match fields.remove("type") {
        Some(Value::Object(flags)) => flags,
        _ => return Err(v1_failure(format!("action {index} has no type"))),
    };
    let name = flags
        .iter()
        .find(|(_, set)| set.as_bool().unwrap_or(false))
        .map(|(name, _)| name.as_str())
        .ok_or_else(|| v1_failure(format!("action {index} has no type")))?;
    let tag = V1_TAGS
        .iter()
        .find(|(v1, _)| *v1 == name)
        .map(|(_, v2)| *v2)
        .ok_or_else(|| v1_failure(format!("action {index} has unknown type '{name}'")))?;

    if tag == "freeTime"
        && !fields.contains_key("minutes")
        && let Some(minutes) = fields.remove("freeTime")
    {
        fields.insert("minutes".into(), minutes);
    }
    fields.insert("type".into(), json!(tag));
    Ok(Value::Object(fields))
}

// ===========================================================================
// Tests
// ===========================================================================
