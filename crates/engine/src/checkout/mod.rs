//! Checkout Handshake.
//!
//! Opens an external payment window and reduces its lifecycle to exactly one
//! terminal outcome for the host page. See [`session`] for the state machine
//! and [`runner`] for the awaitable driver.

pub mod runner;
pub mod scripted;
pub mod session;

pub use runner::{CheckoutCallbacks, CheckoutHandshake};
pub use scripted::{CheckoutScript, ScriptAction, ScriptStep, ScriptedPopupHost};
pub use session::{
    CheckoutError, CheckoutSession, POPUP_BLOCKED_MESSAGE, PopupFeatures, PopupHost, PopupWindow, SessionOptions, SessionState,
    WindowGeometry,
};
