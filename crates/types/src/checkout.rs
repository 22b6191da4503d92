//! Wire types for the checkout handshake between a host page and the
//! external payment window.
//!
//! The payment window posts a [`CheckoutMessagePayload`] back to the host,
//! where it arrives wrapped in a [`CheckoutMessage`] that records the origin
//! the message was posted from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow kind that initiated a checkout. Fixed for a session's lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutSource {
    Consultation,
    Subscription,
    Service,
}

impl CheckoutSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutSource::Consultation => "consultation",
            CheckoutSource::Subscription => "subscription",
            CheckoutSource::Service => "service",
        }
    }

    /// Message type announcing a completed payment, e.g. `intake-service-success`.
    pub fn success_type(&self, namespace: &str) -> String {
        format!("{}-{}-success", namespace, self.as_str())
    }

    /// Message type announcing an explicit cancellation on the remote side.
    pub fn cancelled_type(&self, namespace: &str) -> String {
        format!("{}-{}-cancelled", namespace, self.as_str())
    }
}

impl fmt::Display for CheckoutSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload posted by the checkout window. Reference fields are passed
/// through verbatim and never validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CheckoutMessagePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A cross-document message as delivered to the host page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutMessage {
    /// Origin the message was posted from.
    pub origin: String,
    pub data: CheckoutMessagePayload,
}

impl CheckoutMessage {
    pub fn new(origin: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: CheckoutMessagePayload {
                kind: kind.into(),
                ..CheckoutMessagePayload::default()
            },
        }
    }

    pub fn with_reference(mut self, tracker: Option<&str>, reference: Option<&str>, signature: Option<&str>) -> Self {
        self.data.tracker = tracker.map(str::to_string);
        self.data.reference = reference.map(str::to_string);
        self.data.signature = signature.map(str::to_string);
        self
    }
}

/// Payment references carried by a success message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CheckoutReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl From<&CheckoutMessagePayload> for CheckoutReceipt {
    fn from(payload: &CheckoutMessagePayload) -> Self {
        Self {
            tracker: payload.tracker.clone(),
            reference: payload.reference.clone(),
            signature: payload.signature.clone(),
        }
    }
}

/// The single terminal result of a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The window reported a completed payment.
    Success(CheckoutReceipt),
    /// The window reported an explicit cancellation.
    Cancelled,
    /// The window closed without posting a result.
    SilentClose,
}
