//! Controller events and listener plumbing
//!
//! OS lifecycle callbacks, connectivity changes, push notifications and settings
//! updates all arrive as [`ControllerEvent`]s on one unbounded channel. The
//! controller drains that channel serially, so handlers never interleave.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::ProviderType;
use crate::notification::RawNotification;

/// Sender half handed to external sources
pub type EventSink = mpsc::UnboundedSender<ControllerEvent>;

/// OS application state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl AppState {
    pub fn is_background(self) -> bool {
        self == AppState::Background
    }
}

impl FromStr for AppState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AppState::Active),
            "inactive" => Ok(AppState::Inactive),
            "background" => Ok(AppState::Background),
            _ => Err(format!("Invalid app state: {}", s)),
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Active => write!(f, "active"),
            AppState::Inactive => write!(f, "inactive"),
            AppState::Background => write!(f, "background"),
        }
    }
}

/// Network-status payload. `is_connected` is `None` while the platform is
/// still determining reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    #[serde(rename = "isConnected")]
    pub is_connected: Option<bool>,
}

impl ConnectivityStatus {
    pub fn connected() -> Self {
        Self {
            is_connected: Some(true),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            is_connected: Some(false),
        }
    }

    pub fn unknown() -> Self {
        Self { is_connected: None }
    }
}

/// Everything the controller reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// OS lifecycle transition
    AppStateChanged(AppState),
    /// Network reachability changed; `None` when the source delivered no payload
    ConnectivityChanged(Option<ConnectivityStatus>),
    /// Push notification delivered by the OS
    NotificationReceived(RawNotification),
    /// UI locale switched
    LocaleChanged(String),
    /// Auto-lock timeout setting changed
    LockTimeChanged(u64),
    /// Privacy setting for third-party transaction APIs changed
    ThirdPartyApiModeChanged(bool),
    /// Selected network provider changed
    ProviderChanged(ProviderType),
    /// Deferred mount work of the given mount is due
    DeferredInit(u64),
    /// Forced reload window of the given locale change elapsed
    ReloadWindowElapsed(u64),
}

/// Registration with an external source. Removal runs exactly once: either via
/// [`ListenerHandle::remove`] or when the handle is dropped.
pub struct ListenerHandle {
    name: &'static str,
    remover: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerHandle {
    pub fn new(name: &'static str, remover: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            remover: Mutex::new(Some(Box::new(remover))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Release the registration. Safe to call more than once.
    pub fn remove(&self) {
        let remover = match self.remover.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(remover) = remover {
            tracing::debug!(listener = self.name, "Removing listener");
            remover();
        }
    }

    pub fn is_active(&self) -> bool {
        match self.remover.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

/// OS lifecycle callback source
pub trait AppStateSource: Send + Sync {
    fn add_listener(&self, sink: EventSink) -> ListenerHandle;
}

/// Network-status source
pub trait ConnectivitySource: Send + Sync {
    fn add_listener(&self, sink: EventSink) -> ListenerHandle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_app_state_parsing() {
        assert_eq!("background".parse::<AppState>(), Ok(AppState::Background));
        assert_eq!("Active".parse::<AppState>(), Ok(AppState::Active));
        assert!("suspended".parse::<AppState>().is_err());
        assert!(AppState::Background.is_background());
        assert!(!AppState::Inactive.is_background());
    }

    #[test]
    fn test_connectivity_status_null_payload() {
        let status: ConnectivityStatus =
            serde_json::from_str(r#"{"isConnected": null}"#).unwrap();
        assert_eq!(status, ConnectivityStatus::unknown());

        let status: ConnectivityStatus =
            serde_json::from_str(r#"{"isConnected": false}"#).unwrap();
        assert_eq!(status, ConnectivityStatus::disconnected());
    }

    #[test]
    fn test_listener_handle_removes_once() {
        let removed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&removed);
        let handle = ListenerHandle::new("app_state", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(handle.name(), "app_state");
        assert!(handle.is_active());
        handle.remove();
        handle.remove();
        assert!(!handle.is_active());
        drop(handle);

        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_handle_removes_on_drop() {
        let removed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&removed);
        {
            let _handle = ListenerHandle::new("connectivity", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }
}
