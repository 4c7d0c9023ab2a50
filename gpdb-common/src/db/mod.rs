//! Registry storage: schema, store, request review and reconciliation

pub mod init;
pub mod models;
pub mod reconcile;
pub mod requests;
pub mod store;

pub use init::*;
pub use models::*;
pub use reconcile::{synchronize, SyncReport};
pub use store::{timestamp_now, Store, TIMESTAMP_FORMAT};
