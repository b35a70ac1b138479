//! Reconciliation channel: operator alerts when ledger and orders may disagree
//!
//! # Architecture
//!
//! ```text
//! failed rollback / commit, ledger replay mismatch
//!   └─ ReconciliationService::raise()
//!        ├─ tracing::error!(target: "reconciliation")  synchronous
//!        └─ mpsc → ReconciliationWorker → reconciliation_issue table
//! ```
//!
//! Operators list and resolve issues through `/api/reconciliation/issues`.

pub mod service;
pub mod worker;

pub use service::{AlertKind, ReconciliationAlert, ReconciliationService};
pub use worker::ReconciliationWorker;
