//! Warehouse backends for the schema-write adaptor
//!
//! The adaptor talks to warehouses through one narrow port,
//! [`WarehouseBackend`]: create-dataset, create-table, get-table-schema,
//! update-table-schema, delete-table, bulk-insert and run-sql. Any
//! warehouse that can implement those seven calls can sit behind the
//! adaptor.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `bigquery` - Google BigQuery support
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablesink_warehouse::{BigQueryWarehouse, WarehouseBackend};
//!
//! let backend = BigQueryWarehouse::with_adc("my-project").await?;
//! backend.run_sql("SELECT 1").await?;
//! ```

pub mod bigquery;
pub mod mock;
pub mod port;

pub use bigquery::BigQueryWarehouse;
pub use mock::MockWarehouse;
pub use port::{BackendError, InsertOutcome, RowError, TableSpec, WarehouseBackend};
