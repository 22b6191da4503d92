//! Resolution of a service's document catalog against live answers.
//!
//! All functions here are total: a catalog entry pointing at an unknown
//! category or naming an unknown operator degrades to "not shown" / "false"
//! instead of failing the applicant's intake flow.

use std::collections::HashSet;

use intake_types::{AnswerSet, CategorizedDocuments, DocumentCategory, DocumentRequirement, DocumentValidation};
use tracing::debug;

use super::condition::evaluate_condition;

/// Returns the requirements that apply given `answers`, in catalog order.
///
/// An unconditional requirement is included when `required` is set. A
/// conditional requirement is included exactly when its condition holds;
/// its `required` flag plays no part. Requirements sharing an id appear once.
pub fn resolve_required(catalog: &[DocumentRequirement], answers: &AnswerSet) -> Vec<DocumentRequirement> {
    let mut seen: HashSet<&str> = HashSet::new();
    let resolved: Vec<DocumentRequirement> = catalog
        .iter()
        .filter(|requirement| is_active(requirement, answers))
        .filter(|requirement| seen.insert(requirement.id.as_str()))
        .cloned()
        .collect();

    debug!(catalog = catalog.len(), resolved = resolved.len(), "resolved required documents");
    resolved
}

fn is_active(requirement: &DocumentRequirement, answers: &AnswerSet) -> bool {
    match &requirement.condition {
        None => requirement.required,
        Some(condition) => evaluate_condition(condition, answers),
    }
}

/// Groups resolved requirements by category in ascending `order`.
///
/// Categories without any resolved requirement are omitted, and requirements
/// whose `category_id` matches no category are dropped.
pub fn group_by_category(resolved: &[DocumentRequirement], categories: &[DocumentCategory]) -> Vec<CategorizedDocuments> {
    let mut ordered: Vec<&DocumentCategory> = categories.iter().collect();
    ordered.sort_by_key(|category| category.order);

    let groups: Vec<CategorizedDocuments> = ordered
        .into_iter()
        .filter_map(|category| {
            let documents: Vec<DocumentRequirement> = resolved
                .iter()
                .filter(|requirement| requirement.category_id == category.id)
                .cloned()
                .collect();
            if documents.is_empty() {
                return None;
            }
            Some(CategorizedDocuments {
                category: category.clone(),
                documents,
            })
        })
        .collect();

    let known: HashSet<&str> = categories.iter().map(|category| category.id.as_str()).collect();
    let orphaned = resolved
        .iter()
        .filter(|requirement| !known.contains(requirement.category_id.as_str()))
        .count();
    if orphaned > 0 {
        debug!(orphaned, "dropped documents referencing unknown categories");
    }

    groups
}

/// Checks the supplied document ids against the catalog.
///
/// A requirement must be present when it is `required` or carries any
/// condition at all. Conditions are not evaluated here, so a conditional
/// document whose condition is currently false is still reported missing.
/// This is stricter than [`resolve_required`]; the two are kept apart until
/// the intended behavior is settled.
pub fn validate(catalog: &[DocumentRequirement], uploaded_ids: &HashSet<String>) -> DocumentValidation {
    let missing: Vec<DocumentRequirement> = catalog
        .iter()
        .filter(|requirement| requirement.required || requirement.is_conditional())
        .filter(|requirement| !uploaded_ids.contains(&requirement.id))
        .cloned()
        .collect();

    DocumentValidation {
        ok: missing.is_empty(),
        missing,
    }
}

/// Resolved requirements that have not been supplied yet, in resolved order.
pub fn outstanding_documents(resolved: &[DocumentRequirement], uploaded_ids: &HashSet<String>) -> Vec<DocumentRequirement> {
    resolved
        .iter()
        .filter(|requirement| !uploaded_ids.contains(&requirement.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_types::{AnswerValue, ConditionOperator, DocumentCondition};
    use indexmap::indexmap;

    fn ids(documents: &[DocumentRequirement]) -> Vec<&str> {
        documents.iter().map(|document| document.id.as_str()).collect()
    }

    fn uploaded(values: &[&str]) -> HashSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn conditional_required_flag_is_ignored() {
        let catalog = vec![
            DocumentRequirement::new("marriage", "Marriage certificate", "civil", true).with_condition(DocumentCondition::new(
                "married",
                ConditionOperator::Equals,
                true,
            )),
            DocumentRequirement::new("prenup", "Prenuptial agreement", "civil", false).with_condition(DocumentCondition::new(
                "hasPrenup",
                ConditionOperator::Equals,
                true,
            )),
        ];
        let answers = indexmap! {
            "married".to_string() => AnswerValue::Flag(false),
            "hasPrenup".to_string() => AnswerValue::Flag(true),
        };

        assert_eq!(ids(&resolve_required(&catalog, &answers)), vec!["prenup"]);
    }

    #[test]
    fn optional_unconditional_documents_are_excluded() {
        let catalog = vec![
            DocumentRequirement::new("id", "Photo ID", "identity", true),
            DocumentRequirement::new("utility", "Utility bill", "identity", false),
        ];
        assert_eq!(ids(&resolve_required(&catalog, &AnswerSet::new())), vec!["id"]);
    }

    #[test]
    fn duplicate_ids_appear_once() {
        let catalog = vec![
            DocumentRequirement::new("id", "Photo ID", "identity", true),
            DocumentRequirement::new("id", "Photo ID (copy)", "identity", false).with_condition(DocumentCondition::new(
                "anything",
                ConditionOperator::NotEquals,
                "x",
            )),
        ];
        let resolved = resolve_required(&catalog, &AnswerSet::new());
        assert_eq!(ids(&resolved), vec!["id"]);
        assert_eq!(resolved[0].name, "Photo ID");
    }

    #[test]
    fn unanswered_not_equals_condition_requires_document() {
        let catalog = vec![DocumentRequirement::new("residency", "Residency proof", "identity", false).with_condition(
            DocumentCondition::new("country", ConditionOperator::NotEquals, "US"),
        )];
        assert_eq!(ids(&resolve_required(&catalog, &AnswerSet::new())), vec!["residency"]);
    }

    #[test]
    fn grouping_orders_categories_and_omits_empty_ones() {
        let resolved = vec![
            DocumentRequirement::new("w2", "W-2", "income", true),
            DocumentRequirement::new("passport", "Passport", "identity", true),
            DocumentRequirement::new("stray", "Stray", "unknown", true),
            DocumentRequirement::new("1099", "1099", "income", true),
        ];
        let categories = vec![
            DocumentCategory::new("income", "Income", 2),
            DocumentCategory::new("deductions", "Deductions", 3),
            DocumentCategory::new("identity", "Identity", 1),
        ];

        let groups = group_by_category(&resolved, &categories);
        let names: Vec<_> = groups.iter().map(|group| group.category.name.as_str()).collect();
        assert_eq!(names, vec!["Identity", "Income"]);
        assert_eq!(ids(&groups[1].documents), vec!["w2", "1099"]);
        assert!(groups.iter().all(|group| !group.documents.is_empty()));
        assert_eq!(groups.iter().map(|group| group.documents.len()).sum::<usize>(), 3);
    }

    #[test]
    fn validate_reports_missing_required_and_conditional() {
        let catalog = vec![
            DocumentRequirement::new("id", "Photo ID", "identity", true),
            DocumentRequirement::new("utility", "Utility bill", "identity", false),
            DocumentRequirement::new("lease", "Lease", "housing", false).with_condition(DocumentCondition::new(
                "renting",
                ConditionOperator::Equals,
                true,
            )),
        ];

        let result = validate(&catalog, &uploaded(&["id"]));
        assert!(!result.ok);
        assert_eq!(ids(&result.missing), vec!["lease"]);

        let result = validate(&catalog, &uploaded(&["id", "lease"]));
        assert!(result.ok);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn outstanding_excludes_uploaded() {
        let resolved = vec![
            DocumentRequirement::new("a", "A", "c", true),
            DocumentRequirement::new("b", "B", "c", true),
        ];
        assert_eq!(ids(&outstanding_documents(&resolved, &uploaded(&["a"]))), vec!["b"]);
        assert!(outstanding_documents(&resolved, &uploaded(&["a", "b"])).is_empty());
    }
}
