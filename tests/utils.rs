#[cfg(test)]
#[allow(dead_code)]
pub mod test_utils {
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use wallet_lifecycle::{
        AppStateSource, Collaborators, ConnectivitySource, ControllerEvent, Engine, Error,
        EventSink, EventSources, InitialSettings, LifecycleConfig, LifecycleController,
        ListenerHandle, LockManager, NotificationHandle, ProviderType, PushNotificationSource,
        Route, StateStore, ViewHost,
    };

    pub const NORMAL_MS: u64 = 15_000;
    pub const BACKGROUND_MS: u64 = 30_000;
    pub const MOUNT_DELAY_MS: u64 = 1_000;

    pub fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Deferred-init event for the controller's current mount
    pub fn deferred_init(controller: &LifecycleController) -> ControllerEvent {
        ControllerEvent::DeferredInit(controller.mount_generation())
    }

    /// Config with the production cadences
    pub fn test_config() -> LifecycleConfig {
        LifecycleConfig {
            normal_poll_interval_ms: NORMAL_MS,
            background_poll_interval_ms: BACKGROUND_MS,
            mount_delay_ms: MOUNT_DELAY_MS,
            reload_debounce_ms: 1_000,
            default_lock_time_ms: 30_000,
            ..LifecycleConfig::default()
        }
    }

    /// Engine double counting refreshes and in-flight concurrency
    #[derive(Default)]
    pub struct MockEngine {
        pub refreshes: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub block_queries: AtomicUsize,
        pub refresh_delay_ms: AtomicU64,
        pub refresh_error: Mutex<Option<String>>,
        pub block_number_error: Mutex<Option<String>>,
        pub block_errors_as_engine: AtomicBool,
    }

    impl MockEngine {
        pub fn refresh_count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }

        pub fn block_query_count(&self) -> usize {
            self.block_queries.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn set_refresh_delay(&self, millis: u64) {
            self.refresh_delay_ms.store(millis, Ordering::SeqCst);
        }

        pub fn fail_refresh_with(&self, message: &str) {
            *self.refresh_error.lock().unwrap() = Some(message.to_string());
        }

        pub fn fail_block_number_with(&self, message: Option<&str>) {
            *self.block_number_error.lock().unwrap() = message.map(str::to_string);
        }

        /// Report block-number failures as `Error::Engine` instead of `Error::Rpc`
        pub fn report_block_errors_as_engine(&self) {
            self.block_errors_as_engine.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Engine for MockEngine {
        async fn refresh_transaction_history(&self) -> Result<(), Error> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let error = self.refresh_error.lock().unwrap().clone();
            match error {
                Some(message) => Err(Error::Rpc(message)),
                None => Ok(()),
            }
        }

        async fn query_block_number(&self) -> Result<u64, Error> {
            self.block_queries.fetch_add(1, Ordering::SeqCst);
            let error = self.block_number_error.lock().unwrap().clone();
            match error {
                Some(message) if self.block_errors_as_engine.load(Ordering::SeqCst) => {
                    Err(Error::Engine(message))
                }
                Some(message) => Err(Error::Rpc(message)),
                None => Ok(1_234),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum LockCall {
        Start(u64),
        Update(u64),
        Stop,
    }

    #[derive(Default)]
    pub struct MockLockManager {
        pub calls: Mutex<Vec<LockCall>>,
    }

    impl MockLockManager {
        pub fn calls(&self) -> Vec<LockCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn stop_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|call| **call == LockCall::Stop)
                .count()
        }
    }

    impl LockManager for MockLockManager {
        fn start_listening(&self, lock_time_ms: u64) {
            self.calls.lock().unwrap().push(LockCall::Start(lock_time_ms));
        }

        fn update_lock_time(&self, lock_time_ms: u64) {
            self.calls.lock().unwrap().push(LockCall::Update(lock_time_ms));
        }

        fn stop_listening(&self) {
            self.calls.lock().unwrap().push(LockCall::Stop);
        }
    }

    #[derive(Default)]
    pub struct MockView {
        pub routes: Mutex<Vec<Route>>,
        pub reloads: Mutex<Vec<bool>>,
        pub alerts: Mutex<Vec<(String, String)>>,
    }

    impl MockView {
        pub fn routes(&self) -> Vec<Route> {
            self.routes.lock().unwrap().clone()
        }

        pub fn reloads(&self) -> Vec<bool> {
            self.reloads.lock().unwrap().clone()
        }

        pub fn alert_count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    impl ViewHost for MockView {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }

        fn set_force_reload(&self, reloading: bool) {
            self.reloads.lock().unwrap().push(reloading);
        }

        fn show_alert(&self, title: &str, message: &str) {
            self.alerts
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
        }
    }

    #[derive(Default)]
    pub struct MockStore {
        pub not_visible_removals: AtomicUsize,
        pub blocked_dispatches: Mutex<Vec<bool>>,
    }

    impl MockStore {
        pub fn removals(&self) -> usize {
            self.not_visible_removals.load(Ordering::SeqCst)
        }

        pub fn blocked_dispatches(&self) -> Vec<bool> {
            self.blocked_dispatches.lock().unwrap().clone()
        }
    }

    impl StateStore for MockStore {
        fn remove_not_visible_notifications(&self) {
            self.not_visible_removals.fetch_add(1, Ordering::SeqCst);
        }

        fn set_provider_blocked(&self, blocked: bool) {
            self.blocked_dispatches.lock().unwrap().push(blocked);
        }
    }

    /// One registrable source slot tracking adds and removals
    #[derive(Default)]
    pub struct SourceSlot {
        pub sink: Arc<Mutex<Option<EventSink>>>,
        pub added: AtomicUsize,
        pub removed: Arc<AtomicUsize>,
    }

    impl SourceSlot {
        fn register(&self, name: &'static str, sink: EventSink) -> ListenerHandle {
            self.added.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock().unwrap() = Some(sink);

            let slot = Arc::clone(&self.sink);
            let removed = Arc::clone(&self.removed);
            ListenerHandle::new(name, move || {
                *slot.lock().unwrap() = None;
                removed.fetch_add(1, Ordering::SeqCst);
            })
        }

        pub fn is_registered(&self) -> bool {
            self.sink.lock().unwrap().is_some()
        }

        pub fn added(&self) -> usize {
            self.added.load(Ordering::SeqCst)
        }

        pub fn removed(&self) -> usize {
            self.removed.load(Ordering::SeqCst)
        }

        /// Deliver an event the way the platform would; false when nobody listens
        pub fn emit(&self, event: ControllerEvent) -> bool {
            let sink = self.sink.lock().unwrap().clone();
            match sink {
                Some(sink) => sink.send(event).is_ok(),
                None => false,
            }
        }
    }

    #[derive(Default)]
    pub struct MockPlatform {
        pub app_state: SourceSlot,
        pub connectivity: SourceSlot,
        pub push: SourceSlot,
        pub finished: Mutex<Vec<NotificationHandle>>,
    }

    impl MockPlatform {
        pub fn finished_count(&self) -> usize {
            self.finished.lock().unwrap().len()
        }
    }

    impl AppStateSource for MockPlatform {
        fn add_listener(&self, sink: EventSink) -> ListenerHandle {
            self.app_state.register("app_state", sink)
        }
    }

    impl ConnectivitySource for MockPlatform {
        fn add_listener(&self, sink: EventSink) -> ListenerHandle {
            self.connectivity.register("connectivity", sink)
        }
    }

    impl PushNotificationSource for MockPlatform {
        fn configure(&self, sink: EventSink) -> ListenerHandle {
            self.push.register("push", sink)
        }

        fn finish(&self, handle: &NotificationHandle) {
            self.finished.lock().unwrap().push(handle.clone());
        }
    }

    /// Controller plus handles on every double it talks to
    pub struct Harness {
        pub controller: LifecycleController,
        pub engine: Arc<MockEngine>,
        pub lock: Arc<MockLockManager>,
        pub view: Arc<MockView>,
        pub store: Arc<MockStore>,
        pub platform: Arc<MockPlatform>,
    }

    pub fn harness() -> Harness {
        harness_with(test_config(), |_| {})
    }

    pub fn harness_with(
        config: LifecycleConfig,
        tweak: impl FnOnce(&mut InitialSettings),
    ) -> Harness {
        let engine = Arc::new(MockEngine::default());
        let lock = Arc::new(MockLockManager::default());
        let view = Arc::new(MockView::default());
        let store = Arc::new(MockStore::default());
        let platform = Arc::new(MockPlatform::default());

        let mut settings = InitialSettings::from_config(&config);
        settings.provider_type = ProviderType::Mainnet;
        tweak(&mut settings);

        let collaborators = Collaborators {
            engine: engine.clone(),
            lock_manager: lock.clone(),
            view: view.clone(),
            store: store.clone(),
        };
        let sources = EventSources {
            app_state: platform.clone(),
            connectivity: platform.clone(),
            push: platform.clone(),
        };

        Harness {
            controller: LifecycleController::new(config, collaborators, sources, settings),
            engine,
            lock,
            view,
            store,
            platform,
        }
    }
}
