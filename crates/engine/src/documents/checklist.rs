//! Plain-text checklist rendering for categorized requirements.

use std::fmt::Write;

use intake_types::CategorizedDocuments;

/// Legend printed after the last category.
pub const CHECKLIST_LEGEND: &str = "* = required document";

/// Renders a deterministic, human-readable checklist.
///
/// ```text
/// Income
/// Earnings for the tax year
///   1. W-2 Form *
///      Copies: 2
///      Formats: PDF, JPG
///      Alternatives: 1099 OR Final pay stub
///      Notes: One per employer
///
/// * = required document
/// Total documents: 1
/// ```
pub fn render_checklist(groups: &[CategorizedDocuments]) -> String {
    let mut output = String::new();
    let mut total = 0usize;

    for group in groups {
        let _ = writeln!(output, "{}", group.category.name);
        if let Some(description) = group.category.description.as_deref() {
            let _ = writeln!(output, "{}", description);
        }

        for (index, document) in group.documents.iter().enumerate() {
            let marker = if document.required { " *" } else { "" };
            let _ = writeln!(output, "  {}. {}{}", index + 1, document.name, marker);
            if let Some(copies) = document.copies {
                let _ = writeln!(output, "     Copies: {}", copies);
            }
            if !document.formats.is_empty() {
                let _ = writeln!(output, "     Formats: {}", document.formats.join(", "));
            }
            if !document.alternatives.is_empty() {
                let _ = writeln!(output, "     Alternatives: {}", document.alternatives.join(" OR "));
            }
            if let Some(notes) = document.notes.as_deref() {
                let _ = writeln!(output, "     Notes: {}", notes);
            }
        }
        total += group.documents.len();
        output.push('\n');
    }

    let _ = writeln!(output, "{}", CHECKLIST_LEGEND);
    let _ = writeln!(output, "Total documents: {}", total);
    output
}
