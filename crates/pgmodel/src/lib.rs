//! # pgmodel
//!
//! A small record-mapping and query-building layer over pooled PostgreSQL
//! connections.
//!
//! ## Features
//!
//! - **Ad-hoc queries**: `Model::table("t")` with `select` / `joins` /
//!   `where_clause` / `order` / `limit` / `offset`, then `fetch`
//! - **Declared records**: `#[derive(Record)]` binds struct fields to columns
//!   and drives create / fetch / update / delete
//! - **Dirty tracking**: partial updates from a snapshot of the last synced row
//! - **Explicit scopes**: every operation takes a [`Scope`], pooled or pinned
//!   to a [`Transaction`]
//! - **Hooks**: `before_execute` / `after_execute` per record type
//!
//! ## Example
//!
//! ```ignore
//! use pgmodel::{Database, DatabaseConfig, Model, Record, params};
//!
//! #[derive(Debug, Default, Record)]
//! #[orm(table = "employees")]
//! struct Employee {
//!     id: Option<i64>,
//!     name: Option<String>,
//!     age: Option<i32>,
//! }
//!
//! let db = Database::connect(DatabaseConfig::from_env()?)?;
//!
//! let mut alice = Model::from_record(Employee {
//!     name: Some("alice".into()),
//!     age: Some(30),
//!     ..Default::default()
//! });
//! let id = alice.create(&db).await?;
//!
//! let adults = Model::<Employee>::new()
//!     .where_clause("age >= ?", params![18])
//!     .fetch_records(&db)
//!     .await?;
//!
//! pgmodel::transaction!(&db, scope, {
//!     alice.record_mut().age = Some(31);
//!     alice.update(scope).await?;
//!     Ok::<_, pgmodel::ModelError>(())
//! })?;
//! ```

extern crate self as pgmodel;

pub mod binder;
pub mod config;
pub mod decode;
pub mod error;
pub mod hooks;
pub mod model;
pub mod pool;
pub mod record;
pub mod runner;
pub mod scope;
pub mod sql;
pub mod store;
pub mod transaction;
pub mod value;

pub use binder::{export_to_record, import_from_record};
pub use config::DatabaseConfig;
pub use error::{ModelError, ModelResult};
pub use hooks::{Hooks, QueryType};
pub use model::Model;
pub use pool::{Database, create_pool};
pub use record::{Dynamic, FieldDef, Record, Schema};
pub use runner::{execute_raw, load_schema, query_raw};
pub use scope::Scope;
pub use store::{ChangeSet, ColumnValueStore, RowMap};
pub use transaction::Transaction;
pub use value::{ColumnType, Value, ValueKind};

#[cfg(feature = "derive")]
pub use pgmodel_derive::Record;
