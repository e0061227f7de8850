//! The dialect's type system.
//!
//! Scalars are the five classic QBasic kinds; user-defined records are
//! ordered lists of named scalar fields. Every type can produce its
//! canonical default value, and assignment always copies through the
//! target's type (numeric widening/narrowing, strings kept apart).

use crate::value::{RecordValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// The five scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Integer,
    Long,
    Single,
    Double,
    String,
}

impl ScalarKind {
    /// Map a sigil character to its scalar kind (`%` `&` `!` `#` `$`).
    pub fn from_sigil(c: char) -> Option<ScalarKind> {
        match c {
            '%' => Some(ScalarKind::Integer),
            '&' => Some(ScalarKind::Long),
            '!' => Some(ScalarKind::Single),
            '#' => Some(ScalarKind::Double),
            '$' => Some(ScalarKind::String),
            _ => None,
        }
    }

    /// Derive the kind from an identifier's trailing sigil, if present.
    /// A bare identifier yields `None`, signalling the program default.
    pub fn of_name(name: &str) -> Option<ScalarKind> {
        name.chars().last().and_then(ScalarKind::from_sigil)
    }

    /// The keyword naming this kind in source (`AS INTEGER`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            ScalarKind::Integer => "INTEGER",
            ScalarKind::Long => "LONG",
            ScalarKind::Single => "SINGLE",
            ScalarKind::Double => "DOUBLE",
            ScalarKind::String => "STRING",
        }
    }

    pub fn from_keyword(kw: &str) -> Option<ScalarKind> {
        match kw {
            "INTEGER" => Some(ScalarKind::Integer),
            "LONG" => Some(ScalarKind::Long),
            "SINGLE" => Some(ScalarKind::Single),
            "DOUBLE" => Some(ScalarKind::Double),
            "STRING" => Some(ScalarKind::String),
            _ => None,
        }
    }

    /// Canonical zero value.
    pub fn default_value(self) -> Value {
        match self {
            ScalarKind::Integer => Value::Integer(0),
            ScalarKind::Long => Value::Long(0),
            ScalarKind::Single => Value::Single(0.0),
            ScalarKind::Double => Value::Double(0.0),
            ScalarKind::String => Value::Str(String::new()),
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarKind::String)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One field of a user-defined record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub kind: ScalarKind,
}

/// A user-defined record type (`TYPE ... END TYPE`): an ordered list of
/// uniquely named scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<RecordField>,
}

impl RecordType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Instance with every field at its canonical default.
    pub fn create_instance(self: &Rc<RecordType>) -> Value {
        Value::Record(RecordValue {
            ty: Rc::clone(self),
            fields: self.fields.iter().map(|f| f.kind.default_value()).collect(),
        })
    }
}

/// A variable's declared type: a scalar kind or a record.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Scalar(ScalarKind),
    Record(Rc<RecordType>),
}

impl TypeDesc {
    /// Default value for a fresh variable of this type.
    pub fn create_instance(&self) -> Value {
        match self {
            TypeDesc::Scalar(k) => k.default_value(),
            TypeDesc::Record(rt) => rt.create_instance(),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Scalar(k) => k.fmt(f),
            TypeDesc::Record(rt) => f.write_str(&rt.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigils_map_to_kinds() {
        assert_eq!(ScalarKind::of_name("COUNT%"), Some(ScalarKind::Integer));
        assert_eq!(ScalarKind::of_name("TOTAL&"), Some(ScalarKind::Long));
        assert_eq!(ScalarKind::of_name("X!"), Some(ScalarKind::Single));
        assert_eq!(ScalarKind::of_name("Y#"), Some(ScalarKind::Double));
        assert_eq!(ScalarKind::of_name("NAME$"), Some(ScalarKind::String));
        assert_eq!(ScalarKind::of_name("PLAIN"), None);
    }

    #[test]
    fn record_instance_uses_field_defaults() {
        let rt = Rc::new(RecordType {
            name: "POINT".to_string(),
            fields: vec![
                RecordField { name: "X".to_string(), kind: ScalarKind::Single },
                RecordField { name: "LABEL".to_string(), kind: ScalarKind::String },
            ],
        });
        match rt.create_instance() {
            Value::Record(rv) => {
                assert_eq!(rv.fields[0], Value::Single(0.0));
                assert_eq!(rv.fields[1], Value::Str(String::new()));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }
}
