//! A [`PopupHost`] that plays back a scripted checkout instead of opening a
//! real browser window. Used by the CLI `checkout` command and by tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use intake_types::CheckoutMessage;
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::debug;

use super::session::{PopupFeatures, PopupHost, PopupWindow, WindowGeometry};

/// One timed action performed by the scripted checkout window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Delay after the previous step.
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScriptAction {
    /// Deliver a message to the host page.
    Post(CheckoutMessage),
    /// Close the most recently opened window.
    Close(bool),
}

/// A full playback script, as read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutScript {
    /// Whether the popup is blocked.
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

struct ScriptedWindow {
    closed: Arc<AtomicBool>,
}

impl PopupWindow for ScriptedWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Scripted stand-in for the browser window hosting the checkout.
#[derive(Clone)]
pub struct ScriptedPopupHost {
    origin: String,
    geometry: WindowGeometry,
    blocked: Arc<AtomicBool>,
    windows: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    opened_urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPopupHost {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            geometry: WindowGeometry {
                left: 0,
                top: 0,
                width: 1280,
                height: 800,
            },
            blocked: Arc::new(AtomicBool::new(false)),
            windows: Arc::new(Mutex::new(Vec::new())),
            opened_urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn blocked(self, blocked: bool) -> Self {
        self.set_blocked(blocked);
        self
    }

    pub fn with_geometry(mut self, geometry: WindowGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Marks the most recently opened window as closed.
    pub fn close_window(&self) {
        let windows = self.windows.lock().expect("scripted windows lock poisoned");
        if let Some(closed) = windows.last() {
            closed.store(true, Ordering::SeqCst);
        }
    }

    /// URLs passed to every open attempt, blocked ones included.
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().expect("scripted urls lock poisoned").clone()
    }

    /// Spawns a task performing `steps` in order, posting messages into `messages`.
    pub fn play(&self, steps: Vec<ScriptStep>, messages: UnboundedSender<CheckoutMessage>) -> JoinHandle<()> {
        let host = self.clone();
        tokio::spawn(async move {
            for step in steps {
                if step.after_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(step.after_ms)).await;
                }
                match step.action {
                    ScriptAction::Post(message) => {
                        debug!(kind = %message.data.kind, origin = %message.origin, "scripted window posting message");
                        if messages.send(message).is_err() {
                            break;
                        }
                    }
                    ScriptAction::Close(true) => host.close_window(),
                    ScriptAction::Close(false) => {}
                }
            }
        })
    }
}

impl PopupHost for ScriptedPopupHost {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    fn open_window(&self, url: &str, _name: &str, _features: &PopupFeatures) -> Option<Box<dyn PopupWindow>> {
        self.opened_urls.lock().expect("scripted urls lock poisoned").push(url.to_string());
        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }
        let closed = Arc::new(AtomicBool::new(false));
        self.windows.lock().expect("scripted windows lock poisoned").push(Arc::clone(&closed));
        Some(Box::new(ScriptedWindow { closed }))
    }
}
