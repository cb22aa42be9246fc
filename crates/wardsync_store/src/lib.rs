//! # Wardsync Store
//!
//! Local transactional store contract for the Wardsync engine.
//!
//! The sync engine never talks to a concrete database. It sees the local
//! cache through [`LocalStore`], which offers:
//! - named savepoints (`start`, `release`, `rollback`)
//! - full-table queries with simple equality filters
//! - atomic bulk application of typed [`DbOperation`]s
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - In-memory tables with savepoint snapshots and JSON
//!   persistence, used by tests and the CLI
//!
//! ## Example
//!
//! ```rust
//! use wardsync_store::{DbOperation, Filter, LocalStore, MemoryStore, Row, Table};
//!
//! let store = MemoryStore::new();
//! store.start_named_transaction("demo").unwrap();
//! store
//!     .apply_batch(&[DbOperation::insert(
//!         Table::Users,
//!         Row::new().with("uuid", "u1").with("full_name", "Jane Doe"),
//!     )])
//!     .unwrap();
//! store.rollback_named_transaction("demo").unwrap();
//! store.release_named_transaction("demo").unwrap();
//! assert!(store.query(Table::Users, &Filter::all()).unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod operation;
mod store;
mod table;
mod value;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreSnapshot};
pub use operation::{DbOperation, Filter};
pub use store::LocalStore;
pub use table::Table;
pub use value::{Row, Value};
