//! Document Requirement Resolver.
//!
//! Decides which supporting documents an applicant must supply from a
//! service's requirement catalog and the live intake answers, groups them for
//! presentation, and checks a set of supplied documents against the catalog.

pub mod checklist;
pub mod condition;
pub mod resolver;

pub use checklist::{CHECKLIST_LEGEND, render_checklist};
pub use condition::evaluate_condition;
pub use resolver::{group_by_category, outstanding_documents, resolve_required, validate};
