//! Structured `$filter` expressions for Intersight list queries.
//!
//! A [`Filter`] is a conjunction of clauses. Values are rendered by the
//! filter itself, so string values are always quoted and escaped and no
//! caller ever concatenates a query string by hand.

use std::fmt;

/// A literal compared against a resource field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// String literal, rendered single-quoted.
    Text(String),
    /// Integer literal, rendered bare.
    Integer(i64),
    /// Boolean literal, rendered bare.
    Boolean(bool),
}

/// One clause of a filter conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `field eq value`
    Eq {
        /// Dotted field path, e.g. `Organization.Moid`.
        field: String,
        /// Expected value.
        value: FilterValue,
    },
    /// `collection/any(t: t/field eq value)`
    AnyEq {
        /// Name of the collection-valued field.
        collection: String,
        /// Field of the collection member.
        field: String,
        /// Expected value.
        value: FilterValue,
    },
}

/// Conjunction of equality clauses used to locate a resource by natural key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Creates a filter matching `Name eq '<name>'`.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::new().equals("Name", name.into())
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a clause matching resources whose `collection` holds a member
    /// with `field` equal to `value`.
    #[must_use]
    pub fn any_equals(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.clauses.push(Clause::AnyEq {
            collection: collection.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Returns the clauses of this filter.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns true if the filter has no clauses.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Renders the filter as an OData `$filter` expression.
    #[must_use]
    pub fn to_query(&self) -> String {
        self.clauses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { field, value } => write!(f, "{field} eq {value}"),
            Self::AnyEq {
                collection,
                field,
                value,
            } => write!(f, "{collection}/any(t: t/{field} eq {value})"),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Integer(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
