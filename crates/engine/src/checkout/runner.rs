//! Asynchronous checkout driver.
//!
//! [`CheckoutHandshake`] owns at most one [`CheckoutSession`] at a time and
//! reduces it to a single awaitable result. Messages posted to the host page
//! arrive over a Tokio channel, a fixed-interval ticker checks for a closed
//! popup, and a [`CancellationToken`] lets the host tear the session down.
//! Everything runs on the caller's task; nothing is spawned.

use std::time::Duration;

use intake_types::{CheckoutMessage, CheckoutOutcome, CheckoutReceipt, CheckoutSource};
use intake_util::CheckoutSettings;
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::session::{CheckoutError, CheckoutSession, PopupHost, SessionOptions, SessionState};

/// Drives checkout sessions for one host page.
pub struct CheckoutHandshake<'host> {
    host: &'host dyn PopupHost,
    options: SessionOptions,
    poll_interval: Duration,
    session: Option<CheckoutSession>,
}

impl<'host> CheckoutHandshake<'host> {
    pub fn new(host: &'host dyn PopupHost, options: SessionOptions, poll_interval: Duration) -> Self {
        Self {
            host,
            options,
            poll_interval,
            session: None,
        }
    }

    /// Builds a handshake for `source` from configured checkout settings.
    pub fn from_settings(host: &'host dyn PopupHost, source: CheckoutSource, settings: &CheckoutSettings) -> Self {
        let options = SessionOptions {
            source,
            namespace: settings.namespace.clone(),
            window_name: settings.window_name.clone(),
            popup_width: settings.popup_width,
            popup_height: settings.popup_height,
        };
        Self::new(host, options, settings.poll_interval())
    }

    /// The current (or most recent) session.
    pub fn session(&self) -> Option<&CheckoutSession> {
        self.session.as_ref()
    }

    /// Releases the previous session and opens a fresh one at `checkout_url`.
    ///
    /// A blocked popup is returned as [`CheckoutError::PopupBlocked`]; calling
    /// `open` again retries with another fresh session.
    pub(crate) fn open(&mut self, checkout_url: &str) -> Result<(), CheckoutError> {
        self.teardown();
        let mut session = CheckoutSession::new(self.options.clone());
        let opened = session.open(self.host, checkout_url);
        self.session = Some(session);
        opened
    }

    /// Stops the poll and message handling of the current session, if any.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.teardown();
        }
    }

    /// Opens `checkout_url` and waits for the session's terminal outcome.
    ///
    /// Resolves exactly once: with the first of success, cancellation, or
    /// silent closure, or with [`CheckoutError::Detached`] when `cancel` fires
    /// first. A session has no timeout of its own.
    pub async fn run(
        &mut self,
        checkout_url: &str,
        messages: &mut UnboundedReceiver<CheckoutMessage>,
        cancel: &CancellationToken,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        self.teardown();
        discard_stale_messages(messages);
        self.open(checkout_url)?;
        self.await_outcome(messages, cancel).await
    }

    async fn await_outcome(
        &mut self,
        messages: &mut UnboundedReceiver<CheckoutMessage>,
        cancel: &CancellationToken,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let Some(session) = self.session.as_mut() else {
            return Err(CheckoutError::Detached);
        };
        if session.state() != SessionState::Open {
            return Err(CheckoutError::InvalidState(session.state()));
        }

        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; polling starts one interval after opening.
        ticker.tick().await;
        let mut channel_open = true;

        loop {
            // Biased: a message posted just before the window closes must win over the closure.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    session.teardown();
                    return Err(CheckoutError::Detached);
                }
                maybe_message = messages.recv(), if channel_open => {
                    match maybe_message {
                        Some(message) => {
                            if let Some(outcome) = session.handle_message(&message) {
                                session.teardown();
                                return Ok(outcome);
                            }
                        }
                        None => {
                            debug!("checkout message channel closed; relying on closure polling");
                            channel_open = false;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if let Some(outcome) = session.poll() {
                        session.teardown();
                        return Ok(outcome);
                    }
                }
            }
        }
    }
}

/// Drops messages queued before a session opened; they belong to an earlier attempt.
fn discard_stale_messages(messages: &mut UnboundedReceiver<CheckoutMessage>) {
    let mut discarded = 0usize;
    while messages.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "discarded checkout messages from a previous session");
    }
}

impl Drop for CheckoutHandshake<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

type SuccessCallback = Box<dyn FnOnce(CheckoutReceipt)>;
type CancelCallback = Box<dyn FnOnce()>;
type ErrorCallback = Box<dyn FnOnce(String)>;

/// Callback surface for hosts that prefer callbacks to awaiting a result.
///
/// Delivery consumes the callbacks, so at most one of them ever runs.
pub struct CheckoutCallbacks {
    on_success: SuccessCallback,
    on_cancel: Option<CancelCallback>,
    on_error: Option<ErrorCallback>,
}

impl CheckoutCallbacks {
    pub fn new(on_success: impl FnOnce(CheckoutReceipt) + 'static) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_cancel: None,
            on_error: None,
        }
    }

    pub fn on_cancel(mut self, on_cancel: impl FnOnce() + 'static) -> Self {
        self.on_cancel = Some(Box::new(on_cancel));
        self
    }

    pub fn on_error(mut self, on_error: impl FnOnce(String) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Invokes the callback matching `result`.
    ///
    /// Silent closure and teardown invoke nothing.
    pub fn deliver(self, result: Result<CheckoutOutcome, CheckoutError>) {
        match result {
            Ok(CheckoutOutcome::Success(receipt)) => (self.on_success)(receipt),
            Ok(CheckoutOutcome::Cancelled) => {
                if let Some(on_cancel) = self.on_cancel {
                    on_cancel();
                }
            }
            Ok(CheckoutOutcome::SilentClose) | Err(CheckoutError::Detached) => {}
            Err(error @ (CheckoutError::PopupBlocked(_) | CheckoutError::InvalidState(_))) => {
                if let Some(on_error) = self.on_error {
                    on_error(error.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{POPUP_BLOCKED_MESSAGE, scripted::ScriptedPopupHost};
    use std::{cell::RefCell, rc::Rc};

    fn options() -> SessionOptions {
        SessionOptions::new(CheckoutSource::Subscription, "intake")
    }

    #[test]
    fn callbacks_fire_once_per_outcome_class() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let callbacks = |log: &Rc<RefCell<Vec<String>>>| {
            let success_log = Rc::clone(log);
            let cancel_log = Rc::clone(log);
            let error_log = Rc::clone(log);
            CheckoutCallbacks::new(move |receipt| success_log.borrow_mut().push(format!("success:{:?}", receipt.reference)))
                .on_cancel(move || cancel_log.borrow_mut().push("cancel".into()))
                .on_error(move |message| error_log.borrow_mut().push(format!("error:{message}")))
        };

        callbacks(&log).deliver(Ok(CheckoutOutcome::Success(CheckoutReceipt {
            reference: Some("r".into()),
            ..CheckoutReceipt::default()
        })));
        callbacks(&log).deliver(Ok(CheckoutOutcome::Cancelled));
        callbacks(&log).deliver(Ok(CheckoutOutcome::SilentClose));
        callbacks(&log).deliver(Err(CheckoutError::Detached));
        callbacks(&log).deliver(Err(CheckoutError::PopupBlocked(POPUP_BLOCKED_MESSAGE.into())));

        assert_eq!(
            *log.borrow(),
            vec![
                "success:Some(\"r\")".to_string(),
                "cancel".to_string(),
                format!("error:{POPUP_BLOCKED_MESSAGE}"),
            ]
        );
    }

    #[test]
    fn cancel_without_handler_is_silent() {
        CheckoutCallbacks::new(|_| panic!("success must not fire")).deliver(Ok(CheckoutOutcome::Cancelled));
    }

    #[test]
    fn reopening_releases_previous_session() {
        let host = ScriptedPopupHost::new("https://firm.example");
        let mut handshake = CheckoutHandshake::new(&host, options(), Duration::from_millis(10));

        handshake.open("https://pay.example/1").expect("first open");
        handshake.open("https://pay.example/2").expect("second open");

        let session = handshake.session().expect("session");
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.is_listening());
        assert_eq!(host.opened_urls().len(), 2);
    }

    #[test]
    fn from_settings_copies_popup_options() {
        let host = ScriptedPopupHost::new("https://firm.example");
        let settings = CheckoutSettings {
            namespace: "lexpay".into(),
            popup_width: 640,
            ..CheckoutSettings::default()
        };
        let mut handshake = CheckoutHandshake::from_settings(&host, CheckoutSource::Service, &settings);
        handshake.open("https://pay.example").expect("open");

        let session_options = handshake.session().expect("session").options();
        assert_eq!(session_options.namespace, "lexpay");
        assert_eq!(session_options.popup_width, 640);
        assert_eq!(session_options.source, CheckoutSource::Service);
    }
}
