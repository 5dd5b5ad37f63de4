//! The schema-write adaptor
//!
//! Bridges a generic data-pipeline framework and a columnar cloud
//! warehouse: the framework describes tables with neutral field
//! descriptors and hands over record batches; the adaptor projects those
//! into warehouse DDL and chunked bulk inserts through the
//! [`WarehouseBackend`](tablesink_warehouse::WarehouseBackend) port.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablesink_adaptor::{Adaptor, SchemaWriteAdaptor};
//! use tablesink_core::{FieldDescriptor, TableKind, TableMetadata};
//! use tablesink_warehouse::BigQueryWarehouse;
//!
//! let backend = BigQueryWarehouse::with_adc("my-project").await?;
//! let adaptor = SchemaWriteAdaptor::new(backend);
//!
//! let fields = vec![FieldDescriptor::new("id", &["int", "i_8"]).with_key_flag(true)];
//! adaptor
//!     .create_table("zone.events", &TableMetadata::default(), &fields, TableKind::Aged)
//!     .await?;
//! ```

pub mod adaptor;
pub mod sql;
pub mod writer;

pub use adaptor::{Adaptor, AdaptorResult};
pub use writer::{SchemaWriteAdaptor, INSERT_CHUNK_SIZE};
