//! Lifecycle of a single checkout popup.
//!
//! A [`CheckoutSession`] moves `Idle -> Open -> Resolved` exactly once. Every
//! terminal trigger (success message, cancelled message, window closure) is
//! guarded by "still `Open`", so the first one observed wins and later events
//! are ignored.

use intake_types::{CheckoutMessage, CheckoutOutcome, CheckoutReceipt, CheckoutSource};
use thiserror::Error;
use tracing::{info, trace, warn};

/// Message surfaced when the browser refuses to open the popup.
pub const POPUP_BLOCKED_MESSAGE: &str = "The checkout window was blocked. Please allow popups for this site and try again.";

/// Errors raised while driving a checkout session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// The popup could not be created. The session stays `Idle` and may be reopened.
    #[error("{0}")]
    PopupBlocked(String),
    /// `open` was called on a session that already left `Idle`.
    #[error("checkout session is {0:?}; a new session is required")]
    InvalidState(SessionState),
    /// The host tore the session down before a terminal outcome arrived.
    #[error("checkout session was torn down before it resolved")]
    Detached,
}

/// States of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open,
    Resolved,
}

/// Screen position and size of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Size and placement requested for the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupFeatures {
    /// Centers a `width` x `height` popup over the host window.
    pub fn centered(host: WindowGeometry, width: u32, height: u32) -> Self {
        let left = host.left + (i64::from(host.width) - i64::from(width)) as i32 / 2;
        let top = host.top + (i64::from(host.height) - i64::from(height)) as i32 / 2;
        Self { width, height, left, top }
    }

    /// Window feature string understood by `window.open`.
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={},height={},left={},top={},scrollbars=yes,resizable=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Handle to an opened popup window.
pub trait PopupWindow {
    /// Whether the window has been closed (by the user or by itself).
    fn is_closed(&self) -> bool;
}

/// The page hosting the checkout. Abstracts the browser window so sessions
/// can be driven without one.
pub trait PopupHost {
    /// Origin of the host page; only messages from this origin are accepted.
    fn origin(&self) -> String;

    /// Current geometry of the host window.
    fn geometry(&self) -> WindowGeometry;

    /// Opens a top-level popup, returning `None` when the browser blocks it.
    fn open_window(&self, url: &str, name: &str, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>>;
}

/// Parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub source: CheckoutSource,
    /// Message type prefix.
    pub namespace: String,
    pub window_name: String,
    pub popup_width: u32,
    pub popup_height: u32,
}

impl SessionOptions {
    pub fn new(source: CheckoutSource, namespace: impl Into<String>) -> Self {
        Self {
            source,
            namespace: namespace.into(),
            window_name: "checkout".to_string(),
            popup_width: 500,
            popup_height: 700,
        }
    }
}

/// One checkout attempt. Owns the popup handle and the poll/listener flags.
pub struct CheckoutSession {
    options: SessionOptions,
    state: SessionState,
    host_origin: Option<String>,
    window: Option<Box<dyn PopupWindow>>,
    polling: bool,
    listening: bool,
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("host_origin", &self.host_origin)
            .field("has_window", &self.window.is_some())
            .field("polling", &self.polling)
            .field("listening", &self.listening)
            .finish()
    }
}

impl CheckoutSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: SessionState::Idle,
            host_origin: None,
            window: None,
            polling: false,
            listening: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> CheckoutSource {
        self.options.source
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether the closure poll is running.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Whether the session still accepts messages.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Opens the popup at `checkout_url`.
    ///
    /// On success the session becomes `Open` and starts polling and listening.
    /// A blocked popup leaves the session `Idle` so the caller can retry.
    pub fn open(&mut self, host: &dyn PopupHost, checkout_url: &str) -> Result<(), CheckoutError> {
        if self.state != SessionState::Idle {
            return Err(CheckoutError::InvalidState(self.state));
        }

        let features = PopupFeatures::centered(host.geometry(), self.options.popup_width, self.options.popup_height);
        let Some(window) = host.open_window(checkout_url, &self.options.window_name, &features) else {
            warn!(source = %self.options.source, "checkout popup blocked");
            return Err(CheckoutError::PopupBlocked(POPUP_BLOCKED_MESSAGE.to_string()));
        };

        self.window = Some(window);
        self.host_origin = Some(host.origin());
        self.state = SessionState::Open;
        self.polling = true;
        self.listening = true;
        info!(source = %self.options.source, features = %features.to_feature_string(), "checkout popup opened");
        Ok(())
    }

    /// Handles a message delivered to the host page.
    ///
    /// Messages from a foreign origin or with a type not addressed to this
    /// session's source are ignored and return `None`.
    pub fn handle_message(&mut self, message: &CheckoutMessage) -> Option<CheckoutOutcome> {
        if self.state != SessionState::Open || !self.listening {
            return None;
        }
        if self.host_origin.as_deref() != Some(message.origin.as_str()) {
            trace!(origin = %message.origin, "ignoring checkout message from foreign origin");
            return None;
        }

        let kind = message.data.kind.as_str();
        let outcome = if kind == self.options.source.success_type(&self.options.namespace) {
            CheckoutOutcome::Success(CheckoutReceipt::from(&message.data))
        } else if kind == self.options.source.cancelled_type(&self.options.namespace) {
            CheckoutOutcome::Cancelled
        } else {
            trace!(kind, "ignoring checkout message with unrelated type");
            return None;
        };

        self.resolve();
        info!(source = %self.options.source, ?outcome, "checkout resolved by message");
        Some(outcome)
    }

    /// Checks whether the popup has been closed. A closed window resolves the
    /// session as [`CheckoutOutcome::SilentClose`].
    pub fn poll(&mut self) -> Option<CheckoutOutcome> {
        if self.state != SessionState::Open || !self.polling {
            return None;
        }
        let closed = self.window.as_ref().is_none_or(|window| window.is_closed());
        if !closed {
            return None;
        }

        self.resolve();
        info!(source = %self.options.source, "checkout window closed without a result");
        Some(CheckoutOutcome::SilentClose)
    }

    /// Stops polling and listening. Safe to call in any state, any number of times.
    pub fn teardown(&mut self) {
        self.polling = false;
        self.listening = false;
        self.window = None;
    }

    fn resolve(&mut self) {
        self.state = SessionState::Resolved;
        self.polling = false;
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::scripted::ScriptedPopupHost;

    const ORIGIN: &str = "https://firm.example";

    fn open_session(host: &ScriptedPopupHost) -> CheckoutSession {
        let mut session = CheckoutSession::new(SessionOptions::new(CheckoutSource::Service, "intake"));
        session.open(host, "https://pay.example/checkout/123").expect("open session");
        session
    }

    #[test]
    fn centers_popup_over_host() {
        let host = WindowGeometry {
            left: 100,
            top: 50,
            width: 1200,
            height: 900,
        };
        let features = PopupFeatures::centered(host, 500, 700);
        assert_eq!((features.left, features.top), (450, 150));
        assert_eq!(features.to_feature_string(), "width=500,height=700,left=450,top=150,scrollbars=yes,resizable=yes");
    }

    #[test]
    fn centering_handles_small_host() {
        let features = PopupFeatures::centered(WindowGeometry { left: 0, top: 0, width: 300, height: 300 }, 500, 700);
        assert_eq!((features.left, features.top), (-100, -200));
    }

    #[test]
    fn blocked_popup_stays_idle_and_can_retry() {
        let host = ScriptedPopupHost::new(ORIGIN).blocked(true);
        let mut session = CheckoutSession::new(SessionOptions::new(CheckoutSource::Consultation, "intake"));

        let error = session.open(&host, "https://pay.example").unwrap_err();
        assert_eq!(error, CheckoutError::PopupBlocked(POPUP_BLOCKED_MESSAGE.to_string()));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_polling());

        host.set_blocked(false);
        session.open(&host, "https://pay.example").expect("retry open");
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(host.opened_urls(), vec!["https://pay.example".to_string(), "https://pay.example".to_string()]);
    }

    #[test]
    fn open_is_only_valid_from_idle() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);
        assert_eq!(session.open(&host, "https://pay.example").unwrap_err(), CheckoutError::InvalidState(SessionState::Open));
    }

    #[test]
    fn success_message_resolves_with_receipt() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);
        let message = CheckoutMessage::new(ORIGIN, "intake-service-success").with_reference(Some("trk"), Some("ref"), None);

        let outcome = session.handle_message(&message);
        assert_eq!(
            outcome,
            Some(CheckoutOutcome::Success(CheckoutReceipt {
                tracker: Some("trk".into()),
                reference: Some("ref".into()),
                signature: None,
            }))
        );
        assert_eq!(session.state(), SessionState::Resolved);
        assert!(!session.is_polling());
    }

    #[test]
    fn foreign_origin_is_ignored() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);
        let message = CheckoutMessage::new("https://pay.example", "intake-service-success");

        assert_eq!(session.handle_message(&message), None);
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn other_source_types_are_ignored() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);

        for kind in ["intake-consultation-success", "other-service-success", "intake-service-pending", ""] {
            assert_eq!(session.handle_message(&CheckoutMessage::new(ORIGIN, kind)), None);
        }
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn first_terminal_event_wins() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);

        assert_eq!(
            session.handle_message(&CheckoutMessage::new(ORIGIN, "intake-service-cancelled")),
            Some(CheckoutOutcome::Cancelled)
        );
        host.close_window();
        assert_eq!(session.poll(), None);
        assert_eq!(session.handle_message(&CheckoutMessage::new(ORIGIN, "intake-service-success")), None);
        assert_eq!(session.state(), SessionState::Resolved);
    }

    #[test]
    fn closed_window_resolves_silently() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut session = open_session(&host);

        assert_eq!(session.poll(), None);
        host.close_window();
        assert_eq!(session.poll(), Some(CheckoutOutcome::SilentClose));
        assert_eq!(session.state(), SessionState::Resolved);
        assert_eq!(session.handle_message(&CheckoutMessage::new(ORIGIN, "intake-service-success")), None);
    }

    #[test]
    fn teardown_is_idempotent_and_silences_session() {
        let host = ScriptedPopupHost::new(ORIGIN);
        let mut idle = CheckoutSession::new(SessionOptions::new(CheckoutSource::Subscription, "intake"));
        idle.teardown();
        idle.teardown();
        assert_eq!(idle.state(), SessionState::Idle);

        let mut session = open_session(&host);
        session.teardown();
        session.teardown();
        assert!(!session.is_polling());
        assert!(!session.is_listening());
        host.close_window();
        assert_eq!(session.poll(), None);
        assert_eq!(session.handle_message(&CheckoutMessage::new(ORIGIN, "intake-service-success")), None);
    }
}
