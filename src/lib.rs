pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod notification;
pub mod polling;
pub mod scheduler;

pub use config::LifecycleConfig;
pub use controller::{
    Collaborators, EventSources, InitialSettings, LifecycleController, LifecycleMode,
    LifecycleState,
};
pub use engine::{Engine, LockManager, ProviderType, Route, StateStore, ViewHost};
pub use error::Error;
pub use events::{
    AppState, AppStateSource, ConnectivitySource, ConnectivityStatus, ControllerEvent, EventSink,
    ListenerHandle,
};
pub use logging::{setup_logging, LoggingConfig};
pub use notification::{
    NotificationEvent, NotificationHandle, NotificationKind, Platform, PushNotificationSource,
    RawNotification,
};
pub use polling::{Cadence, PollGuard, PollOutcome};
