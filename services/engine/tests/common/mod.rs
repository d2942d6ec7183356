//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stockwatch_engine::db::{Database, SubscriptionStore, User};
use stockwatch_engine::notify::{AvailabilityNotice, Notifier, NotifyError};
use stockwatch_engine::service::WatchService;
use stockwatch_inventory::{
    CacheConfig, ClientConfig, EndpointRegistry, ManualClock, Region, ResponseCache,
    AVAILABILITIES_PATH,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every delivery; fails for selected users.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing: Mutex<HashSet<i64>>,
}

impl FakeNotifier {
    pub fn fail_for(&self, user_id: i64) {
        self.failing.lock().unwrap().insert(user_id);
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: i64) -> usize {
        self.sent().iter().filter(|(id, _)| *id == user_id).count()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, user: &User, notice: &AvailabilityNotice) -> Result<(), NotifyError> {
        if self.failing.lock().unwrap().contains(&user.id) {
            return Err(NotifyError::Rejected {
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((user.id, notice.render_html(user)));
        Ok(())
    }
}

pub struct Harness {
    pub server: MockServer,
    pub clock: Arc<ManualClock>,
    pub registry: Arc<EndpointRegistry>,
    pub db: Database,
    pub store: SubscriptionStore,
    pub notifier: Arc<FakeNotifier>,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(ResponseCache::with_clock(
            CacheConfig::default(),
            clock.clone(),
        ));
        let registry = Arc::new(
            EndpointRegistry::new(
                vec![Region::new("ovh-eu", "Europe", &server.uri(), &["FR"])],
                cache,
                &ClientConfig::default(),
            )
            .expect("registry"),
        );
        let db = Database::in_memory().await.expect("database");
        let store = db.subscription_store();

        Self {
            server,
            clock,
            registry,
            db,
            store,
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    pub fn service(&self) -> WatchService {
        WatchService::new(self.registry.clone(), self.store.clone())
    }

    /// Replace every upstream mock with a fixed availability answer and
    /// expire the cache.
    pub async fn upstream_availability(&self, status: u16, body: &str) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(AVAILABILITIES_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_raw(body.as_bytes().to_vec(), "application/json"),
            )
            .mount(&self.server)
            .await;
        self.clock.advance(std::time::Duration::from_secs(600));
    }
}

/// Availability answer for `24ska01` with the given datacenter statuses.
pub fn availability(statuses: &[(&str, &str)]) -> String {
    let datacenters: Vec<_> = statuses
        .iter()
        .map(|(dc, status)| serde_json::json!({"datacenter": dc, "availability": status}))
        .collect();
    serde_json::json!([{
        "fqn": "24ska01.ram-32g-ecc-2133.softraid-2x2000sa",
        "planCode": "24ska01",
        "server": "24ska01",
        "memory": "ram-32g-ecc-2133",
        "storage": "softraid-2x2000sa",
        "datacenters": datacenters
    }])
    .to_string()
}

pub fn unavailable_everywhere() -> String {
    availability(&[("gra", "unavailable"), ("rbx", "unavailable"), ("bhs", "comingSoon")])
}

pub fn available_in_gra() -> String {
    availability(&[("gra", "1H-low"), ("rbx", "unavailable"), ("bhs", "unavailable")])
}
