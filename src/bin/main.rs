//! Wallet lifecycle simulator
//!
//! Runs the lifecycle controller against in-memory collaborators and replays a
//! scripted session: foreground polling, a trip to the background, a push
//! notification, a locale switch, a lock-time change and a connectivity flap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use wallet_lifecycle::{
    config::PROVIDER_BLOCKED_MESSAGE, AppState, AppStateSource, Collaborators, ConnectivitySource,
    ConnectivityStatus, ControllerEvent, Engine, Error, EventSink, EventSources, InitialSettings,
    LifecycleConfig, LifecycleController, ListenerHandle, LockManager, LoggingConfig,
    NotificationHandle, ProviderType, PushNotificationSource, RawNotification, Route, StateStore,
    ViewHost,
};

#[derive(Parser)]
#[command(name = "lifecycle-sim")]
#[command(about = "Replay a scripted wallet session through the lifecycle controller")]
#[command(version)]
struct Args {
    /// Foreground poll interval in milliseconds (overrides config)
    #[arg(long, default_value = "1500")]
    normal_interval_ms: u64,

    /// Background poll interval in milliseconds (overrides config)
    #[arg(long, default_value = "3000")]
    background_interval_ms: u64,

    /// Allow transaction-history polling against third-party APIs
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    third_party_api_mode: bool,

    /// Network provider (mainnet, goerli, rpc, ...)
    #[arg(short, long, default_value = "mainnet")]
    provider: ProviderType,

    /// Make the provider answer with the region-blocked error
    #[arg(long)]
    blocked: bool,

    /// Fail every Nth history refresh (0 disables failures)
    #[arg(long, default_value = "3")]
    fail_every: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

struct SimEngine {
    refreshes: AtomicU64,
    fail_every: u64,
    blocked: bool,
}

#[async_trait]
impl Engine for SimEngine {
    async fn refresh_transaction_history(&self) -> Result<(), Error> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(200)).await;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(Error::Rpc("simulated gateway timeout".to_string()));
        }
        tracing::info!(refresh = n, "Transaction history refreshed");
        Ok(())
    }

    async fn query_block_number(&self) -> Result<u64, Error> {
        if self.blocked {
            Err(Error::Rpc(PROVIDER_BLOCKED_MESSAGE.to_string()))
        } else {
            Ok(17_000_000)
        }
    }
}

struct SimLockManager;

impl LockManager for SimLockManager {
    fn start_listening(&self, lock_time_ms: u64) {
        tracing::info!(lock_time_ms, "Lock manager listening");
    }

    fn update_lock_time(&self, lock_time_ms: u64) {
        tracing::info!(lock_time_ms, "Lock manager timeout updated");
    }

    fn stop_listening(&self) {
        tracing::info!("Lock manager stopped");
    }
}

struct SimView;

impl ViewHost for SimView {
    fn navigate(&self, route: Route) {
        tracing::info!(?route, "Navigate");
    }

    fn set_force_reload(&self, reloading: bool) {
        tracing::info!(reloading, "Force reload");
    }

    fn show_alert(&self, title: &str, message: &str) {
        tracing::warn!(title, message, "Alert shown");
    }
}

struct SimStore;

impl StateStore for SimStore {
    fn remove_not_visible_notifications(&self) {
        tracing::debug!("Removed non-visible notifications");
    }

    fn set_provider_blocked(&self, blocked: bool) {
        tracing::info!(blocked, "Provider availability dispatched");
    }
}

/// Platform stand-in holding whichever sinks are currently registered
#[derive(Default)]
struct SimPlatform {
    app_state: Arc<Mutex<Option<EventSink>>>,
    connectivity: Arc<Mutex<Option<EventSink>>>,
    push: Arc<Mutex<Option<EventSink>>>,
}

fn register(
    slot: &Arc<Mutex<Option<EventSink>>>,
    name: &'static str,
    sink: EventSink,
) -> ListenerHandle {
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(sink);
    }
    let slot = Arc::clone(slot);
    ListenerHandle::new(name, move || {
        if let Ok(mut guard) = slot.lock() {
            *guard = None;
        }
    })
}

fn emit(slot: &Arc<Mutex<Option<EventSink>>>, event: ControllerEvent) {
    let sink = slot.lock().ok().and_then(|guard| guard.clone());
    match sink {
        Some(sink) => {
            let _ = sink.send(event);
        }
        None => tracing::debug!(?event, "No listener registered, event dropped"),
    }
}

impl AppStateSource for SimPlatform {
    fn add_listener(&self, sink: EventSink) -> ListenerHandle {
        register(&self.app_state, "app_state", sink)
    }
}

impl ConnectivitySource for SimPlatform {
    fn add_listener(&self, sink: EventSink) -> ListenerHandle {
        register(&self.connectivity, "connectivity", sink)
    }
}

impl PushNotificationSource for SimPlatform {
    fn configure(&self, sink: EventSink) -> ListenerHandle {
        register(&self.push, "push", sink)
    }

    fn finish(&self, handle: &NotificationHandle) {
        tracing::debug!(?handle, "Notification finished");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if args.debug {
        logging.level = wallet_lifecycle::logging::LogLevel::Debug;
    }
    wallet_lifecycle::setup_logging(&logging).context("Failed to initialise logging")?;

    let mut config = LifecycleConfig::load().context("Failed to load lifecycle config")?;
    config.normal_poll_interval_ms = args.normal_interval_ms;
    config.background_poll_interval_ms = args.background_interval_ms;
    config.validate()?;

    let engine = Arc::new(SimEngine {
        refreshes: AtomicU64::new(0),
        fail_every: args.fail_every,
        blocked: args.blocked,
    });
    let platform = Arc::new(SimPlatform::default());

    let collaborators = Collaborators {
        engine: engine.clone(),
        lock_manager: Arc::new(SimLockManager),
        view: Arc::new(SimView),
        store: Arc::new(SimStore),
    };
    let sources = EventSources {
        app_state: platform.clone(),
        connectivity: platform.clone(),
        push: platform.clone(),
    };

    let mut settings = InitialSettings::from_config(&config);
    settings.third_party_api_mode = args.third_party_api_mode;
    settings.provider_type = args.provider;

    let normal = config.normal_poll_interval();
    let background = config.background_poll_interval();
    let mut controller = LifecycleController::new(config, collaborators, sources, settings);
    let settings_sink = controller.sender();

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let runner = tokio::spawn(async move {
        let result = controller.run(token).await;
        (controller, result)
    });

    tracing::info!("Session started in foreground");
    tokio::time::sleep(normal * 2 + normal / 2).await;

    emit(&platform.app_state, ControllerEvent::AppStateChanged(AppState::Background));
    tokio::time::sleep(background * 2 + background / 2).await;

    emit(&platform.app_state, ControllerEvent::AppStateChanged(AppState::Active));
    tokio::time::sleep(normal / 2).await;

    emit(
        &platform.push,
        ControllerEvent::NotificationReceived(RawNotification::android(
            Some("sim-1".to_string()),
            Some(r#"{"action":"tx","id":"0x5e1f"}"#.to_string()),
        )),
    );
    emit(
        &platform.push,
        ControllerEvent::NotificationReceived(RawNotification::android(
            Some("sim-2".to_string()),
            Some("{broken".to_string()),
        )),
    );

    let _ = settings_sink.send(ControllerEvent::LocaleChanged("es".to_string()));
    let _ = settings_sink.send(ControllerEvent::LockTimeChanged(60_000));
    let _ = settings_sink.send(ControllerEvent::LockTimeChanged(60_000));

    emit(
        &platform.connectivity,
        ControllerEvent::ConnectivityChanged(Some(ConnectivityStatus::disconnected())),
    );
    emit(
        &platform.connectivity,
        ControllerEvent::ConnectivityChanged(Some(ConnectivityStatus::unknown())),
    );
    emit(
        &platform.connectivity,
        ControllerEvent::ConnectivityChanged(Some(ConnectivityStatus::connected())),
    );

    tokio::time::sleep(normal * 2).await;
    shutdown.cancel();

    let (controller, result) = runner.await.context("Controller task panicked")?;
    result?;

    let state = controller.state();
    println!("Session finished");
    println!("  history refreshes attempted: {}", engine.refreshes.load(Ordering::SeqCst));
    println!("  locale:                      {}", state.locale);
    println!("  lock timeout (ms):           {}", state.lock_timeout_ms);
    println!("  connected:                   {}", state.connected);
    println!("  provider blocked:            {}", state.provider_blocked);
    Ok(())
}
