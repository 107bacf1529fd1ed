//! Push notification decoding
//!
//! Android delivers the app payload as a JSON string in `tag`; iOS delivers it
//! as an already-decoded `data` object. Both are normalised into a
//! [`NotificationEvent`] before routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::events::{EventSink, ListenerHandle};

/// Payload action marking a transaction deep link
pub const TX_ACTION: &str = "tx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

/// Native handle that must be finalized once the notification is consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationHandle {
    pub id: Option<String>,
    pub platform: Platform,
}

/// Notification as delivered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    pub id: Option<String>,
    pub platform: Platform,
    pub tag: Option<String>,
    pub data: Option<Value>,
    pub received_at: DateTime<Utc>,
}

impl RawNotification {
    pub fn android(id: Option<String>, tag: Option<String>) -> Self {
        Self {
            id,
            platform: Platform::Android,
            tag,
            data: None,
            received_at: Utc::now(),
        }
    }

    pub fn ios(id: Option<String>, data: Option<Value>) -> Self {
        Self {
            id,
            platform: Platform::Ios,
            tag: None,
            data,
            received_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> NotificationHandle {
        NotificationHandle {
            id: self.id.clone(),
            platform: self.platform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Tx,
    Generic,
}

/// App-level payload carried inside a push notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub action: Option<String>,
    /// Transaction id for `tx` actions
    pub id: Option<String>,
}

#[derive(Deserialize)]
struct WirePayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    id: Option<Value>,
}

impl From<WirePayload> for NotificationPayload {
    fn from(wire: WirePayload) -> Self {
        let id = match wire.id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            action: wire.action,
            id,
        }
    }
}

/// Decoded notification ready for routing
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
    pub handle: NotificationHandle,
    pub received_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Decode the platform payload. A notification without any payload is a
    /// generic notification, not an error.
    pub fn from_raw(raw: &RawNotification) -> Result<Self, Error> {
        let payload = match raw.platform {
            Platform::Android => match &raw.tag {
                Some(tag) => {
                    let wire: WirePayload = serde_json::from_str(tag)?;
                    wire.into()
                }
                None => NotificationPayload::default(),
            },
            Platform::Ios => match &raw.data {
                Some(Value::Null) | None => NotificationPayload::default(),
                Some(data) => {
                    let wire: WirePayload = serde_json::from_value(data.clone())?;
                    wire.into()
                }
            },
        };

        let kind = if payload.action.as_deref() == Some(TX_ACTION) {
            NotificationKind::Tx
        } else {
            NotificationKind::Generic
        };

        Ok(Self {
            kind,
            payload,
            handle: raw.handle(),
            received_at: raw.received_at,
        })
    }
}

/// OS push-notification subsystem
pub trait PushNotificationSource: Send + Sync {
    /// Install the single `on_notification` callback
    fn configure(&self, sink: EventSink) -> ListenerHandle;
    /// Tell the OS the notification was handled
    fn finish(&self, handle: &NotificationHandle);
}
