//! Scalar and cardinality types for schema definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value type of a searchable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Whole numbers, including primary and foreign keys.
    Integer,
    /// Floating point numbers.
    Float,
    /// Unicode text (stored NFD-normalized).
    String,
    /// True/false flags.
    Boolean,
    /// Calendar dates (`YYYY-MM-DD`).
    Date,
    /// Timestamps (`YYYY-MM-DDTHH:MM:SS[.ffffff]`).
    Datetime,
}

impl ScalarType {
    /// Returns the lowercase name used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::Datetime => "datetime",
        }
    }

    /// Returns true if values of this type have a meaningful order.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, ScalarType::Boolean)
    }

    /// Returns true if values of this type are text.
    pub fn is_textual(&self) -> bool {
        matches!(self, ScalarType::String)
    }

    /// Returns all scalar types.
    pub fn all() -> &'static [ScalarType] {
        &[
            ScalarType::Integer,
            ScalarType::Float,
            ScalarType::String,
            ScalarType::Boolean,
            ScalarType::Date,
            ScalarType::Datetime,
        ]
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How many related rows a relation can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// At most one related row (many-to-one).
    ToOne,
    /// Any number of related rows (one-to-many or many-to-many).
    ToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::ToOne => write!(f, "to-one"),
            Cardinality::ToMany => write!(f, "to-many"),
        }
    }
}
