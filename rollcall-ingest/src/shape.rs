//! Singular/plural shape normalization
//!
//! The source documents come from an XML-to-JSON conversion that renders a
//! one-element collection as a bare object and a larger one as an array. Every
//! nesting level of the ventilation payload has this ambiguity, so each level
//! goes through [`normalize_to_list`] before it is iterated.

use crate::error::{MalformedShape, ShapeLevel};
use serde_json::Value;

/// Shape of a value that should semantically be a collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// Missing key or explicit null
    Absent,
    /// One item encoded as a bare object
    Single(&'a Value),
    /// Items encoded as an array
    List(&'a [Value]),
}

impl<'a> Shape<'a> {
    /// Classify a collection value found at `level`
    pub fn of(value: Option<&'a Value>, level: ShapeLevel) -> Result<Self, MalformedShape> {
        match value {
            None | Some(Value::Null) => Ok(Shape::Absent),
            Some(Value::Array(items)) => Ok(Shape::List(items.as_slice())),
            Some(object) if object.is_object() => Ok(Shape::Single(object)),
            Some(other) => Err(MalformedShape::new(level, other)),
        }
    }

    pub fn into_list(self) -> Vec<&'a Value> {
        match self {
            Shape::Absent => Vec::new(),
            Shape::Single(item) => vec![item],
            Shape::List(items) => items.iter().collect(),
        }
    }
}

/// Return the items of a collection regardless of how it was encoded
///
/// Absent → empty, array → its items, object → one-element list. Any other
/// value is a [`MalformedShape`]; callers log it and treat the branch as
/// empty.
pub fn normalize_to_list(
    value: Option<&Value>,
    level: ShapeLevel,
) -> Result<Vec<&Value>, MalformedShape> {
    Shape::of(value, level).map(Shape::into_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_null_are_empty() {
        assert!(normalize_to_list(None, ShapeLevel::Voter).unwrap().is_empty());
        assert!(normalize_to_list(Some(&Value::Null), ShapeLevel::Voter).unwrap().is_empty());
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let value = json!({"acteurRef": "PA1"});
        let list = normalize_to_list(Some(&value), ShapeLevel::Voter).unwrap();
        assert_eq!(list, vec![&value]);
    }

    #[test]
    fn test_array_is_unchanged() {
        let value = json!([{"acteurRef": "PA1"}, {"acteurRef": "PA2"}]);
        let list = normalize_to_list(Some(&value), ShapeLevel::Group).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["acteurRef"], "PA2");
    }

    #[test]
    fn test_empty_array_is_empty() {
        let value = json!([]);
        assert!(normalize_to_list(Some(&value), ShapeLevel::Body).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_is_malformed() {
        let value = json!("PA1");
        let err = normalize_to_list(Some(&value), ShapeLevel::Voter).unwrap_err();
        assert_eq!(err.level, ShapeLevel::Voter);
        assert_eq!(err.found, "string");

        let value = json!(3);
        let err = normalize_to_list(Some(&value), ShapeLevel::Group).unwrap_err();
        assert_eq!(err.found, "number");
    }
}
