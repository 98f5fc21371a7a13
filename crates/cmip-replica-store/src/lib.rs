// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod completion;
mod connection;
mod error;
mod inventory;
mod reconcile;

pub const CRATE_NAME: &str = "cmip-replica-store";

pub use completion::{mark_completed_datasets, CompletionReport, DEFAULT_CREATED_AFTER};
pub use connection::{open_snapshot, open_tracking_store, LOCK_WAIT};
pub use error::{StoreError, StoreErrorCode, StoreResult};
pub use inventory::{list_data_nodes, status_counts, StatusCount};
pub use reconcile::{DatasetOutcome, Reconciler, COMMIT_BATCH_ROWS};
