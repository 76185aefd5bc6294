//! Shared runtime state for mpr-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The ports are trait
//! objects so the same router runs against Postgres in production and the
//! in-memory testkit in tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mpr_reconcile::{
    CatalogSyncClient, FormulaRegistry, ReconcileOptions, ReconcilePorts, SpotPriceRepository,
    VariantConfigStore,
};
use mpr_schemas::BatchRunSummary;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    RunStarted {
        run_id: Uuid,
    },
    /// `summary` is set when the run completed; `error` when it did not.
    RunFinished {
        run_id: Uuid,
        summary: Option<BatchRunSummary>,
        error: Option<String>,
    },
    LogLine {
        level: String,
        msg: String,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::RunStarted { .. } => "run_started",
            BusMsg::RunFinished { .. } => "run_finished",
            BusMsg::LogLine { .. } => "log",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Owned handles to the four ports.
#[derive(Clone)]
pub struct DaemonPorts {
    pub spot: Arc<dyn SpotPriceRepository>,
    pub configs: Arc<dyn VariantConfigStore>,
    pub formulas: Arc<dyn FormulaRegistry>,
    pub catalog: Arc<dyn CatalogSyncClient>,
}

impl DaemonPorts {
    pub fn reconcile(&self) -> ReconcilePorts<'_> {
        ReconcilePorts {
            spot: self.spot.as_ref(),
            configs: self.configs.as_ref(),
            formulas: self.formulas.as_ref(),
            catalog: self.catalog.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct RunStatus {
    pub active_run_id: Option<Uuid>,
    pub last_run: Option<BatchRunSummary>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub ports: DaemonPorts,
    pub reconcile_opts: ReconcileOptions,
    /// Currency stamped on spot prices posted without one.
    pub default_currency: String,
    pub status: RwLock<RunStatus>,
    run_guard: Arc<Mutex<()>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(ports: DaemonPorts, reconcile_opts: ReconcileOptions, default_currency: &str) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "mpr-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            ports,
            reconcile_opts,
            default_currency: default_currency.to_string(),
            status: RwLock::new(RunStatus::default()),
            run_guard: Arc::new(Mutex::new(())),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Claim the single run slot. `None` while another run holds it. The
    /// guard is owned so it can move into the task that executes the run.
    pub fn try_begin_run(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.run_guard).try_lock_owned().ok()
    }

    /// Send on the bus; having no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
