//! App lifecycle controller
//!
//! Owns the foreground/background state machine of the wallet's main screen and
//! every side effect hanging off it: transaction-history polling cadence, push
//! notification routing, connectivity tracking, provider liveness and the
//! auto-lock timer.
//!
//! All mutation happens on the controller's own event loop ([`LifecycleController::run`])
//! or through direct `&mut self` calls, so handlers never interleave.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::LifecycleConfig;
use crate::engine::{Engine, LockManager, ProviderType, Route, StateStore, ViewHost};
use crate::error::Error;
use crate::events::{
    AppState, AppStateSource, ConnectivitySource, ConnectivityStatus, ControllerEvent, EventSink,
    ListenerHandle,
};
use crate::notification::{
    NotificationEvent, NotificationKind, PushNotificationSource, RawNotification,
};
use crate::polling::{Cadence, PollGuard, PollingTask};
use crate::scheduler::ScheduledTask;

/// Foreground/background mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleMode {
    Foreground,
    Background,
}

/// State owned exclusively by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    pub background_mode: bool,
    pub locale: String,
    pub lock_timeout_ms: u64,
    pub connected: bool,
    pub provider_type: ProviderType,
    pub provider_blocked: bool,
    pub third_party_api_mode: bool,
    /// Main navigator is unmounted while a locale change settles
    pub force_reload: bool,
    pub mounted: bool,
}

/// Settings snapshot the controller starts from
#[derive(Debug, Clone, PartialEq)]
pub struct InitialSettings {
    pub locale: String,
    pub lock_time_ms: u64,
    pub third_party_api_mode: bool,
    pub provider_type: ProviderType,
}

impl InitialSettings {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            locale: config.initial_locale.clone(),
            lock_time_ms: config.default_lock_time_ms,
            third_party_api_mode: true,
            provider_type: ProviderType::Mainnet,
        }
    }
}

/// Services the controller calls into
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn Engine>,
    pub lock_manager: Arc<dyn LockManager>,
    pub view: Arc<dyn ViewHost>,
    pub store: Arc<dyn StateStore>,
}

/// Platform sources the controller subscribes to
#[derive(Clone)]
pub struct EventSources {
    pub app_state: Arc<dyn AppStateSource>,
    pub connectivity: Arc<dyn ConnectivitySource>,
    pub push: Arc<dyn PushNotificationSource>,
}

#[derive(Debug, Default)]
struct Subscriptions {
    app_state: Option<ListenerHandle>,
    connectivity: Option<ListenerHandle>,
    push: Option<ListenerHandle>,
}

impl Subscriptions {
    fn release(&mut self) {
        for handle in [
            self.app_state.take(),
            self.connectivity.take(),
            self.push.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.remove();
        }
    }
}

pub struct LifecycleController {
    config: LifecycleConfig,
    state: LifecycleState,
    collaborators: Collaborators,
    sources: EventSources,
    event_tx: EventSink,
    event_rx: Option<mpsc::UnboundedReceiver<ControllerEvent>>,
    third_party_api_mode_tx: watch::Sender<bool>,
    polling: Option<PollingTask>,
    poll_guard: PollGuard,
    deferred_init: Option<ScheduledTask>,
    mount_generation: u64,
    deferred_init_done: bool,
    reload_timer: Option<ScheduledTask>,
    reload_generation: u64,
    subscriptions: Subscriptions,
    lock_listening: bool,
}

impl LifecycleController {
    pub fn new(
        config: LifecycleConfig,
        collaborators: Collaborators,
        sources: EventSources,
        settings: InitialSettings,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (third_party_api_mode_tx, _) = watch::channel(settings.third_party_api_mode);

        let state = LifecycleState {
            background_mode: false,
            locale: settings.locale,
            lock_timeout_ms: settings.lock_time_ms,
            connected: true,
            provider_type: settings.provider_type,
            provider_blocked: false,
            third_party_api_mode: settings.third_party_api_mode,
            force_reload: false,
            mounted: false,
        };

        Self {
            config,
            state,
            collaborators,
            sources,
            event_tx,
            event_rx: Some(event_rx),
            third_party_api_mode_tx,
            polling: None,
            poll_guard: PollGuard::default(),
            deferred_init: None,
            mount_generation: 0,
            deferred_init_done: false,
            reload_timer: None,
            reload_generation: 0,
            subscriptions: Subscriptions::default(),
            lock_listening: false,
        }
    }

    /// Sender for settings/locale/provider updates coming from the app store
    pub fn sender(&self) -> EventSink {
        self.event_tx.clone()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn mode(&self) -> LifecycleMode {
        if self.state.background_mode {
            LifecycleMode::Background
        } else {
            LifecycleMode::Foreground
        }
    }

    /// Cadence of the running poll loop; `None` only while unmounted
    pub fn active_cadence(&self) -> Option<Cadence> {
        self.polling
            .as_ref()
            .filter(|task| !task.is_stopped())
            .map(PollingTask::cadence)
    }

    pub fn is_mounted(&self) -> bool {
        self.state.mounted
    }

    /// Incremented on every mount; tags the deferred-init event of that mount
    pub fn mount_generation(&self) -> u64 {
        self.mount_generation
    }

    /// Register listeners, start the lock timer and normal polling, and
    /// schedule the deferred provider check and connectivity subscription.
    pub fn mount(&mut self) -> Result<(), Error> {
        if self.state.mounted {
            return Err(Error::AlreadyMounted);
        }

        self.subscriptions.app_state = Some(self.sources.app_state.add_listener(self.sender()));
        self.subscriptions.push = Some(self.sources.push.configure(self.sender()));

        self.collaborators
            .lock_manager
            .start_listening(self.state.lock_timeout_ms);
        self.lock_listening = true;

        self.collaborators.store.remove_not_visible_notifications();

        self.state.mounted = true;
        self.state.background_mode = false;
        self.start_polling(Cadence::Normal, false);

        self.mount_generation += 1;
        let generation = self.mount_generation;
        let sink = self.sender();
        self.deferred_init_done = false;
        self.deferred_init = Some(ScheduledTask::spawn(
            "deferred_init",
            self.config.mount_delay(),
            async move {
                let _ = sink.send(ControllerEvent::DeferredInit(generation));
            },
        ));

        tracing::info!(
            locale = %self.state.locale,
            lock_time_ms = self.state.lock_timeout_ms,
            third_party_api_mode = self.state.third_party_api_mode,
            provider = %self.state.provider_type,
            "Lifecycle controller mounted"
        );
        Ok(())
    }

    /// Release every listener and timer. Idempotent; also runs on drop.
    pub fn unmount(&mut self) {
        let was_mounted = self.state.mounted;
        self.release();
        if was_mounted {
            tracing::info!("Lifecycle controller unmounted");
        }
    }

    fn release(&mut self) {
        if let Some(polling) = self.polling.take() {
            polling.stop();
        }
        if let Some(task) = self.deferred_init.take() {
            task.cancel();
        }
        if let Some(task) = self.reload_timer.take() {
            task.cancel();
        }

        self.subscriptions.release();

        if self.state.force_reload {
            self.state.force_reload = false;
            self.collaborators.view.set_force_reload(false);
        }

        if self.lock_listening {
            self.collaborators.lock_manager.stop_listening();
            self.lock_listening = false;
        }

        self.state.mounted = false;
    }

    /// Drive the controller from its event channel until `shutdown` fires.
    /// Mounts first if needed and always unmounts on the way out.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), Error> {
        let mut event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| Error::Other("Controller event loop is already running".to_string()))?;

        if !self.state.mounted {
            if let Err(e) = self.mount() {
                self.event_rx = Some(event_rx);
                return Err(e);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }

        self.unmount();
        self.event_rx = Some(event_rx);
        Ok(())
    }

    /// Dispatch one event to its handler
    pub async fn handle_event(&mut self, event: ControllerEvent) {
        tracing::trace!(?event, "Handling controller event");
        match event {
            ControllerEvent::AppStateChanged(app_state) => self.handle_app_state_change(app_state),
            ControllerEvent::ConnectivityChanged(status) => {
                self.on_connectivity_change(status);
            }
            ControllerEvent::NotificationReceived(raw) => {
                self.on_notification_received(&raw);
            }
            ControllerEvent::LocaleChanged(locale) => {
                self.on_locale_change(locale);
            }
            ControllerEvent::LockTimeChanged(lock_time_ms) => {
                self.on_lock_time_change(lock_time_ms);
            }
            ControllerEvent::ThirdPartyApiModeChanged(enabled) => self.on_settings_change(enabled),
            ControllerEvent::ProviderChanged(provider) => self.on_provider_change(provider).await,
            ControllerEvent::DeferredInit(generation) => self.run_deferred_init(generation).await,
            ControllerEvent::ReloadWindowElapsed(generation) => self.finish_reload(generation),
        }
    }

    /// Foreground/background transition.
    ///
    /// Runs to completion without suspending, so the cadence switch is done
    /// before the next lifecycle event is looked at.
    pub fn handle_app_state_change(&mut self, app_state: AppState) {
        if !self.state.mounted {
            tracing::debug!(%app_state, "Ignoring app state change while unmounted");
            return;
        }

        let to_background = app_state.is_background();
        match (self.state.background_mode, to_background) {
            (true, false) => {
                tracing::info!(%app_state, "App returned to foreground");
                self.state.background_mode = false;
                self.start_polling(Cadence::Normal, true);
            }
            (false, true) => {
                tracing::info!("App moved to background");
                self.state.background_mode = true;
                self.collaborators.store.remove_not_visible_notifications();
                self.start_polling(Cadence::Background, false);
            }
            _ => tracing::trace!(%app_state, "App state unchanged"),
        }
    }

    fn start_polling(&mut self, cadence: Cadence, fire_immediately: bool) {
        if let Some(previous) = self.polling.take() {
            previous.stop();
        }

        let period = match cadence {
            Cadence::Normal => self.config.normal_poll_interval(),
            Cadence::Background => self.config.background_poll_interval(),
        };

        self.polling = Some(PollingTask::start(
            cadence,
            period,
            fire_immediately,
            Arc::clone(&self.collaborators.engine),
            self.third_party_api_mode_tx.subscribe(),
            Arc::clone(&self.poll_guard),
        ));
    }

    async fn run_deferred_init(&mut self, generation: u64) {
        if !self.state.mounted || self.deferred_init_done {
            return;
        }
        if generation != self.mount_generation {
            tracing::debug!(generation, "Ignoring deferred init from a previous mount");
            return;
        }
        self.deferred_init_done = true;
        self.deferred_init = None;

        self.subscriptions.connectivity =
            Some(self.sources.connectivity.add_listener(self.sender()));
        self.check_provider_availability().await;
    }

    /// Probe the provider and flip the blocked flag on the blocked signature.
    /// Returns the flag after the check.
    pub async fn check_provider_availability(&mut self) -> bool {
        if self.state.provider_type.is_custom() {
            self.set_provider_blocked(false);
            return self.state.provider_blocked;
        }

        match self.collaborators.engine.query_block_number().await {
            Ok(block_number) => {
                tracing::debug!(
                    block_number,
                    provider = %self.state.provider_type,
                    "Provider reachable"
                );
                self.set_provider_blocked(false);
            }
            Err(e) if e.is_provider_blocked(&self.config.provider_blocked_message) => {
                tracing::warn!(
                    provider = %self.state.provider_type,
                    "Provider refuses service in this region"
                );
                self.set_provider_blocked(true);
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    provider = %self.state.provider_type,
                    "Provider liveness probe failed"
                );
            }
        }

        self.state.provider_blocked
    }

    fn set_provider_blocked(&mut self, blocked: bool) {
        self.state.provider_blocked = blocked;
        self.collaborators.store.set_provider_blocked(blocked);
    }

    /// Apply a network-status update. Returns whether `connected` changed.
    pub fn on_connectivity_change(&mut self, status: Option<ConnectivityStatus>) -> bool {
        let Some(is_connected) = status.and_then(|s| s.is_connected) else {
            return false;
        };

        if is_connected == self.state.connected {
            return false;
        }

        if is_connected {
            tracing::info!("Network connectivity restored");
        } else {
            tracing::warn!("Network connectivity lost");
        }
        self.state.connected = is_connected;
        true
    }

    /// Route a push notification and finalize its native handle.
    pub fn on_notification_received(&mut self, raw: &RawNotification) -> Option<NotificationEvent> {
        let decoded = match NotificationEvent::from_raw(raw) {
            Ok(event) => {
                if event.kind == NotificationKind::Tx {
                    tracing::info!(
                        transaction_id = ?event.payload.id,
                        "Opening transactions from notification"
                    );
                    self.collaborators.view.navigate(Route::TransactionsHome {
                        transaction_id: event.payload.id.clone(),
                    });
                }
                Some(event)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    platform = ?raw.platform,
                    "Could not decode notification payload"
                );
                self.collaborators
                    .view
                    .show_alert("Notification error", &e.to_string());
                None
            }
        };

        self.sources.push.finish(&raw.handle());
        decoded
    }

    /// Force one view reload per distinct locale. Returns whether a reload started.
    pub fn on_locale_change(&mut self, locale: String) -> bool {
        if locale == self.state.locale {
            return false;
        }

        tracing::info!(from = %self.state.locale, to = %locale, "Locale changed, reloading views");
        self.state.locale = locale;
        self.state.force_reload = true;
        self.collaborators.view.set_force_reload(true);

        self.reload_generation += 1;
        let generation = self.reload_generation;
        let sink = self.sender();
        self.reload_timer = Some(ScheduledTask::spawn(
            "reload_window",
            self.config.reload_debounce(),
            async move {
                let _ = sink.send(ControllerEvent::ReloadWindowElapsed(generation));
            },
        ));
        true
    }

    /// End the forced reload started by locale change `generation`
    pub fn finish_reload(&mut self, generation: u64) {
        if generation != self.reload_generation || !self.state.force_reload {
            return;
        }
        self.reload_timer = None;
        self.state.force_reload = false;
        self.collaborators.view.set_force_reload(false);
    }

    /// Forward a new auto-lock timeout. Returns whether the lock manager was updated.
    pub fn on_lock_time_change(&mut self, lock_time_ms: u64) -> bool {
        if lock_time_ms == self.state.lock_timeout_ms {
            return false;
        }

        self.state.lock_timeout_ms = lock_time_ms;
        if !self.lock_listening {
            return false;
        }

        tracing::debug!(lock_time_ms, "Updating auto-lock timeout");
        self.collaborators.lock_manager.update_lock_time(lock_time_ms);
        true
    }

    /// Publish the third-party API privacy setting to the running poll loop
    pub fn on_settings_change(&mut self, third_party_api_mode: bool) {
        if third_party_api_mode == self.state.third_party_api_mode {
            return;
        }
        tracing::info!(third_party_api_mode, "Third-party API mode changed");
        self.state.third_party_api_mode = third_party_api_mode;
        self.third_party_api_mode_tx.send_replace(third_party_api_mode);
    }

    /// Record a network switch and re-probe the new provider
    pub async fn on_provider_change(&mut self, provider: ProviderType) {
        if provider == self.state.provider_type {
            return;
        }
        tracing::info!(from = %self.state.provider_type, to = %provider, "Provider changed");
        self.state.provider_type = provider;

        if self.state.mounted && self.deferred_init_done {
            self.check_provider_availability().await;
        }
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        self.release();
    }
}
