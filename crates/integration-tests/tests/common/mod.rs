// Shared test harness: throwaway store, manual clock, recording notifier
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lanekeeper_core::application::QueueService;
use lanekeeper_core::config::EngineConfig;
use lanekeeper_core::domain::UserProfile;
use lanekeeper_core::port::auth::StaticOperatorSet;
use lanekeeper_core::port::token_issuer::UuidTokenIssuer;
use lanekeeper_core::port::{CalledNotice, Notifier, TicketRepository, TimeProvider};
use lanekeeper_infra_sqlite::{create_pool, run_migrations, SqliteTicketRepository};
use sqlx::SqlitePool;

pub const OPERATOR: &str = "op-1";

/// Fresh file-backed database per test so every pooled connection sees the
/// same data (a plain `:memory:` database is per-connection)
fn temp_db_path() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "lanekeeper_it_{}_{}.db",
        std::process::id(),
        n
    ));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}

/// Settable clock so tests control created_at ordering and token expiry
pub struct ManualTimeProvider {
    now: AtomicI64,
}

impl ManualTimeProvider {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_millis: i64) {
        self.now.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Captures dispatch notices instead of delivering them
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<CalledNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<CalledNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn ticket_called(&self, notice: CalledNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct TestContext {
    pub service: Arc<QueueService>,
    pub repo: Arc<SqliteTicketRepository>,
    pub pool: SqlitePool,
    pub time: Arc<ManualTimeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: EngineConfig,
}

impl TestContext {
    /// Service over a fresh store, seeded lanes, one operator
    pub async fn new() -> Self {
        Self::with_start_time(1_000_000).await
    }

    pub async fn with_start_time(start_millis: i64) -> Self {
        let pool = create_pool(&temp_db_path()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let config = EngineConfig {
            operators: HashSet::from([OPERATOR.to_string()]),
            ..EngineConfig::default()
        };

        let repo = Arc::new(SqliteTicketRepository::new(pool.clone()));
        let time = Arc::new(ManualTimeProvider::new(start_millis));
        let notifier = Arc::new(RecordingNotifier::default());

        let service = Arc::new(QueueService::new(
            repo.clone(),
            Arc::new(UuidTokenIssuer::new(config.token_ttl_ms)),
            notifier.clone(),
            Arc::new(StaticOperatorSet::new(config.operators.clone())),
            time.clone(),
            config.clone(),
        ));

        service.ensure_lanes().await.unwrap();

        Self {
            service,
            repo,
            pool,
            time,
            notifier,
            config,
        }
    }

    /// Active ticket status straight from the store
    pub async fn active_status_of(
        &self,
        external_id: &str,
    ) -> Option<lanekeeper_core::domain::TicketStatus> {
        let user = self.repo.find_user(external_id).await.unwrap()?;
        self.repo
            .find_active_ticket(user.id)
            .await
            .unwrap()
            .map(|t| t.status)
    }
}

pub fn profile(external_id: &str) -> UserProfile {
    UserProfile::new(
        external_id,
        format!("chat-{}", external_id),
        format!("User {}", external_id),
    )
}
