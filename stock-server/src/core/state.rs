use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::fulfillment::{Coordinator, WebOrderService};
use crate::inventory::StockMutator;
use crate::pos::PosCheckoutProcessor;
use crate::reconciliation::{ReconciliationAlert, ReconciliationService, ReconciliationWorker};
use crate::statistics::SalesAggregator;
use crate::utils::{AppError, AppResult};

/// Reconciliation alert channel capacity
const RECONCILIATION_BUFFER: usize = 256;

/// Server state - shared handles to every service
///
/// Every service wraps a `SqlitePool` or `Arc`, so cloning is cheap.
///
/// | Field | Description |
/// |------|------|
/// | config | Configuration (immutable) |
/// | db | SQLite pool |
/// | jwt_service | JWT verification |
/// | inventory | Inventory ledger (Stock Mutator) |
/// | web_orders | Web orders |
/// | pos | POS checkout |
/// | statistics | Cross-channel sales statistics |
/// | reconciliation | Reconciliation alert channel |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub jwt_service: Arc<JwtService>,
    pub inventory: StockMutator,
    pub web_orders: WebOrderService,
    pub pos: PosCheckoutProcessor,
    pub statistics: SalesAggregator,
    pub reconciliation: Arc<ReconciliationService>,
    reconciliation_rx: Arc<Mutex<Option<mpsc::Receiver<ReconciliationAlert>>>>,
}

impl ServerState {
    /// Initialize server state
    ///
    /// 1. create the working directory (database/)
    /// 2. open the database and run migrations
    /// 3. build the services
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        std::fs::create_dir_all(config.database_dir()).map_err(|e| {
            AppError::config(format!(
                "Failed to create {}: {e}",
                config.database_dir().display()
            ))
        })?;
        let db = DbService::new(&config.database_url).await?;
        Ok(Self::with_db(config.clone(), db))
    }

    /// Build state around an open database (tests use this too)
    pub fn with_db(config: Config, db: DbService) -> Self {
        let pool = db.pool.clone();
        let retry = config.retry_policy();
        let (reconciliation, rx) = ReconciliationService::new(pool.clone(), RECONCILIATION_BUFFER);
        let coordinator = Coordinator::new(
            pool.clone(),
            retry,
            config.low_stock_threshold,
            reconciliation.clone(),
        );

        Self {
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            inventory: StockMutator::new(
                pool.clone(),
                retry,
                config.low_stock_threshold,
                reconciliation.clone(),
            ),
            web_orders: WebOrderService::new(coordinator.clone()),
            pos: PosCheckoutProcessor::new(coordinator, config.timezone),
            statistics: SalesAggregator::new(pool, config.timezone),
            reconciliation,
            reconciliation_rx: Arc::new(Mutex::new(Some(rx))),
            config,
            db,
        }
    }

    /// Start background tasks (reconciliation alert persistence)
    ///
    /// Must run inside a tokio runtime; later calls are no-ops.
    pub fn start_background_tasks(&self) {
        let rx = self
            .reconciliation_rx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        match rx {
            Some(rx) => {
                let worker = ReconciliationWorker::new(self.db.pool.clone());
                tokio::spawn(worker.run(rx));
            }
            None => tracing::debug!("Background tasks already started"),
        }
    }

    /// Get the JWT service
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
