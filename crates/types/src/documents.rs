//! Document requirement catalog definitions shared by the resolver, the CLI,
//! and catalog authoring tools.
//!
//! Catalogs are authored per service and treated as read-only configuration.
//! Field names follow the camelCase convention used by the catalog documents
//! (`categoryId`, `requiredDocuments`, ...).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One entry in a service's required-document catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequirement {
    /// Identifier, unique within a catalog.
    pub id: String,
    /// Display name shown to applicants.
    #[serde(default)]
    pub name: String,
    /// Foreign key into [`DocumentCategory::id`].
    pub category_id: String,
    /// Baseline requirement flag. Advisory only when `condition` is present.
    #[serde(default)]
    pub required: bool,
    /// Predicate gating inclusion against the live answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DocumentCondition>,
    /// Number of copies requested (at least one when present).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    /// Accepted file-format labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
    /// Ordered substitute document names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// Free-text guidance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DocumentRequirement {
    /// Creates an unconditional requirement with no presentation metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>, category_id: impl Into<String>, required: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
            required,
            condition: None,
            copies: None,
            formats: Vec::new(),
            alternatives: Vec::new(),
            notes: None,
        }
    }

    /// Attaches a gating condition.
    pub fn with_condition(mut self, condition: DocumentCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// Predicate over a single answer-set field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentCondition {
    /// Key looked up in the [`AnswerSet`].
    pub field: String,
    pub operator: ConditionOperator,
    /// Right-hand side of the comparison.
    pub value: AnswerValue,
}

impl DocumentCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: impl Into<AnswerValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Comparison operators understood by the resolver.
///
/// Operators are written in camelCase; the PascalCase spelling is accepted
/// on input. Catalog entries naming any other operator deserialize to
/// [`ConditionOperator::Unknown`], which always evaluates to `false`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    #[serde(alias = "Equals")]
    Equals,
    #[serde(alias = "NotEquals")]
    NotEquals,
    #[serde(alias = "Includes")]
    Includes,
    #[serde(alias = "GreaterThan")]
    GreaterThan,
    #[serde(alias = "LessThan")]
    LessThan,
    #[serde(other)]
    Unknown,
}

/// A single answer captured by the intake form, or the literal a condition
/// compares against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Flag(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(value as f64)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::List(value)
    }
}

/// Live form answers keyed by field name, in the order they were first answered.
pub type AnswerSet = IndexMap<String, AnswerValue>;

/// Presentation grouping for requirements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCategory {
    pub id: String,
    pub name: String,
    /// Ascending display order.
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DocumentCategory {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            description: None,
        }
    }
}

/// Requirements resolved into one category, as produced by grouping.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategorizedDocuments {
    pub category: DocumentCategory,
    pub documents: Vec<DocumentRequirement>,
}

/// Outcome of checking supplied documents against a catalog.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentValidation {
    pub ok: bool,
    pub missing: Vec<DocumentRequirement>,
}

/// The document catalog published for a single service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCatalog {
    /// Service identifier (for example, `tax-return-filing`).
    #[serde(default)]
    pub service: Option<String>,
    /// Optional human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub required_documents: Vec<DocumentRequirement>,
    #[serde(default)]
    pub document_categories: Vec<DocumentCategory>,
}

/// Catalogs for several services keyed by service identifier, preserving authoring order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogBundle {
    pub services: IndexMap<String, ServiceCatalog>,
}
