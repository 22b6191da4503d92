//! # Intake Engine
//!
//! The intake engine backs the service-registration flow: an applicant
//! registers for a service, supplies the documents their answers call for,
//! pays through an external checkout window, and receives a confirmation.
//!
//! ## Key Features
//!
//! - **Document resolution**: decides which catalog documents apply to the
//!   current answers, groups them by category, and renders a checklist
//! - **Submission validation**: checks supplied document ids against the catalog
//! - **Checkout handshake**: drives an untrusted payment popup to exactly one
//!   terminal outcome
//! - **Catalog loading**: reads single-service or bundled catalogs from YAML/JSON
//!
//! ## Usage
//!
//! ```rust
//! use intake_engine::documents::{group_by_category, render_checklist, resolve_required};
//! use intake_types::{AnswerSet, AnswerValue, DocumentCategory, DocumentRequirement};
//!
//! let catalog = vec![DocumentRequirement::new("id", "Photo ID", "identity", true)];
//! let categories = vec![DocumentCategory::new("identity", "Identity", 0)];
//!
//! let mut answers = AnswerSet::new();
//! answers.insert("married".into(), AnswerValue::Flag(true));
//!
//! let resolved = resolve_required(&catalog, &answers);
//! let checklist = render_checklist(&group_by_category(&resolved, &categories));
//! assert!(checklist.contains("1. Photo ID *"));
//! ```
//!
//! ## Architecture
//!
//! - **`documents`**: condition evaluation, resolution, grouping, validation, checklist
//! - **`checkout`**: popup session state machine and its async driver
//! - **`intake`**: per-applicant run state tying both together

use std::{fs, path::Path};

use anyhow::{Context, Result};
use intake_types::{CatalogBundle, ServiceCatalog};

pub mod checkout;
pub mod documents;
pub mod intake;

pub use checkout::{CheckoutCallbacks, CheckoutError, CheckoutHandshake, CheckoutSession, PopupHost, PopupWindow, SessionState};
pub use documents::{evaluate_condition, group_by_category, outstanding_documents, render_checklist, resolve_required, validate};
pub use intake::{IntakeEvent, IntakeRun, IntakeStage};

/// Loads a catalog file (YAML or JSON).
///
/// Accepts either a bundle with catalogs under a `services` key or a single
/// service catalog. A single catalog is keyed by its `service` field, or
/// `default` when absent.
///
/// # Errors
///
/// Returns an error when the file cannot be read or matches neither shape.
pub fn parse_catalog_file(file_path: impl AsRef<Path>) -> Result<CatalogBundle> {
    let file_path = file_path.as_ref();
    let file_content = fs::read(file_path).with_context(|| format!("Failed to read catalog file: {}", file_path.display()))?;
    let content_string = String::from_utf8_lossy(&file_content);

    // Try the bundle shape first so a bundle is never read as an empty single catalog.
    if let Ok(bundle) = serde_yaml::from_str::<CatalogBundle>(&content_string) {
        return Ok(bundle);
    }

    if let Ok(catalog) = serde_yaml::from_str::<ServiceCatalog>(&content_string)
        && (!catalog.required_documents.is_empty() || !catalog.document_categories.is_empty() || catalog.service.is_some())
    {
        let service_name = catalog.service.clone().unwrap_or_else(|| "default".to_string());
        let mut bundle = CatalogBundle::default();
        bundle.services.insert(service_name, catalog);
        return Ok(bundle);
    }

    anyhow::bail!(
        "Unsupported catalog document format. Expected one of:\n\
         - Single service catalog with 'service', 'requiredDocuments', and 'documentCategories' fields\n\
         - Catalog bundle with service catalogs under the 'services' key\n\
         "
    );
}

/// Picks a catalog from a bundle by service id, or the only/first one when `service` is `None`.
pub fn select_catalog<'a>(bundle: &'a CatalogBundle, service: Option<&str>) -> Result<&'a ServiceCatalog> {
    match service {
        Some(name) => bundle
            .services
            .get(name)
            .with_context(|| format!("service '{}' not found in catalog", name)),
        None => bundle
            .services
            .values()
            .next()
            .context("catalog file contains no services"),
    }
}
