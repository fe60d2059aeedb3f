//! Field-level patch operations and the helpers backends share to apply
//! them.
//!
//! Paths are dotted (`members.abc123.status`); segments address nested JSON
//! objects. Array fields get set semantics through `AddToSet` /
//! `RemoveFromSet`, both idempotent.

use serde_json::{Map, Value};

/// A single field-level mutation, addressed by a dotted path.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldOp {
    /// Set the field, creating intermediate objects along the path.
    Set(String, Value),
    /// Remove the field. A missing field is a no-op.
    Delete(String),
    /// Append to an array field iff the value is not already present.
    /// A missing or non-array field is replaced by a one-element array.
    AddToSet(String, Value),
    /// Remove every element equal to the value from an array field.
    /// A missing or non-array field is a no-op.
    RemoveFromSet(String, Value),
}

/// Apply a sequence of ops to a document body, in order.
pub fn apply_ops(body: &mut Map<String, Value>, ops: &[FieldOp]) {
    for op in ops {
        match op {
            FieldOp::Set(path, value) => set_path(body, path, value.clone()),
            FieldOp::Delete(path) => delete_path(body, path),
            FieldOp::AddToSet(path, value) => add_to_set(body, path, value.clone()),
            FieldOp::RemoveFromSet(path, value) => remove_from_set(body, path, value),
        }
    }
}

/// Read the value at a dotted path, if present.
pub fn lookup_path<'a>(body: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => body.get(path),
        Some((head, rest)) => match body.get(head) {
            Some(Value::Object(child)) => lookup_path(child, rest),
            _ => None,
        },
    }
}

fn set_path(body: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            body.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let slot = body
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                set_path(child, rest, value);
            }
        }
    }
}

fn delete_path(body: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            body.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = body.get_mut(head) {
                delete_path(child, rest);
            }
        }
    }
}

fn add_to_set(body: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => match body.get_mut(path) {
            Some(Value::Array(items)) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            _ => {
                body.insert(path.to_owned(), Value::Array(vec![value]));
            }
        },
        Some((head, rest)) => {
            let slot = body
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                add_to_set(child, rest, value);
            }
        }
    }
}

fn remove_from_set(body: &mut Map<String, Value>, path: &str, value: &Value) {
    match path.split_once('.') {
        None => {
            if let Some(Value::Array(items)) = body.get_mut(path) {
                items.retain(|v| v != value);
            }
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = body.get_mut(head) {
                remove_from_set(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = Map::new();
        apply_ops(
            &mut doc,
            &[FieldOp::Set("members.u1.role".into(), json!("member"))],
        );
        assert_eq!(
            lookup_path(&doc, "members.u1.role"),
            Some(&json!("member"))
        );
    }

    #[test]
    fn set_overwrites_scalar_with_object() {
        let mut doc = body(json!({ "members": "oops" }));
        apply_ops(&mut doc, &[FieldOp::Set("members.u1".into(), json!({}))]);
        assert_eq!(lookup_path(&doc, "members.u1"), Some(&json!({})));
    }

    #[test]
    fn delete_removes_nested_field() {
        let mut doc = body(json!({ "members": { "u1": { "role": "admin" }, "u2": {} } }));
        apply_ops(&mut doc, &[FieldOp::Delete("members.u1".into())]);
        assert!(lookup_path(&doc, "members.u1").is_none());
        assert!(lookup_path(&doc, "members.u2").is_some());
    }

    #[test]
    fn delete_missing_field_is_noop() {
        let mut doc = body(json!({ "name": "x" }));
        apply_ops(&mut doc, &[FieldOp::Delete("members.u9".into())]);
        assert_eq!(lookup_path(&doc, "name"), Some(&json!("x")));
    }

    #[test]
    fn add_to_set_is_idempotent() {
        let mut doc = body(json!({ "householdIds": ["a"] }));
        apply_ops(
            &mut doc,
            &[
                FieldOp::AddToSet("householdIds".into(), json!("b")),
                FieldOp::AddToSet("householdIds".into(), json!("b")),
            ],
        );
        assert_eq!(lookup_path(&doc, "householdIds"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn add_to_set_replaces_non_array() {
        let mut doc = body(json!({ "householdIds": 42 }));
        apply_ops(&mut doc, &[FieldOp::AddToSet("householdIds".into(), json!("a"))]);
        assert_eq!(lookup_path(&doc, "householdIds"), Some(&json!(["a"])));
    }

    #[test]
    fn add_to_set_creates_missing_field() {
        let mut doc = Map::new();
        apply_ops(&mut doc, &[FieldOp::AddToSet("householdIds".into(), json!("a"))]);
        assert_eq!(lookup_path(&doc, "householdIds"), Some(&json!(["a"])));
    }

    #[test]
    fn remove_from_set_removes_all_equal() {
        let mut doc = body(json!({ "ids": ["a", "b", "a"] }));
        apply_ops(&mut doc, &[FieldOp::RemoveFromSet("ids".into(), json!("a"))]);
        assert_eq!(lookup_path(&doc, "ids"), Some(&json!(["b"])));
    }

    #[test]
    fn remove_from_set_on_missing_is_noop() {
        let mut doc = Map::new();
        apply_ops(&mut doc, &[FieldOp::RemoveFromSet("ids".into(), json!("a"))]);
        assert!(doc.is_empty());
    }

    #[test]
    fn ops_apply_in_order() {
        let mut doc = Map::new();
        apply_ops(
            &mut doc,
            &[
                FieldOp::Set("name".into(), json!("first")),
                FieldOp::Set("name".into(), json!("second")),
            ],
        );
        assert_eq!(lookup_path(&doc, "name"), Some(&json!("second")));
    }
}
