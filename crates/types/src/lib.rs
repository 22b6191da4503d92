//! Shared type definitions for the intake pipeline: the document requirement
//! catalog consumed by the resolver and the wire types of the checkout handshake.

pub mod checkout;
pub mod documents;

pub use checkout::{CheckoutMessage, CheckoutMessagePayload, CheckoutOutcome, CheckoutReceipt, CheckoutSource};
pub use documents::{
    AnswerSet, AnswerValue, CatalogBundle, CategorizedDocuments, ConditionOperator, DocumentCategory, DocumentCondition,
    DocumentRequirement, DocumentValidation, ServiceCatalog,
};
