//! Postes engine: backend client, local storage and reconciliation.
mod client;
mod engine;
mod indicators;
mod persist;
mod reconcile;
mod types;

pub use client::{ClientSettings, IndicatorSource, PostesApi, ReqwestPostesClient};
pub use engine::{EngineConfig, EngineHandle};
pub use indicators::{ChannelEventSink, EventSink, IndicatorBatcher};
pub use persist::{ensure_store_dir, AtomicFileWriter, FileMergeStore, MergeStore, PersistError};
pub use reconcile::{ReconcileError, Reconciler};
pub use types::{ApiError, EngineEvent, FailureKind};
