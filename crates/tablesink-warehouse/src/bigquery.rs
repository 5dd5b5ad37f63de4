//! BigQuery warehouse backend
//!
//! Implements the [`WarehouseBackend`](crate::port::WarehouseBackend) port
//! on top of the BigQuery REST API. It requires appropriate IAM
//! permissions:
//! - bigquery.datasets.create
//! - bigquery.tables.create / update / delete
//! - bigquery.tables.updateData (for streaming inserts)
//!
//! ## Authentication
//!
//! The backend supports multiple authentication methods:
//! 1. An already-authenticated client (explicit handoff)
//! 2. Service account JSON file (explicit path)
//! 3. Application Default Credentials (ADC)
//!
//! ## Usage
//!
//! ```rust,ignore
//! // Using ADC
//! let backend = BigQueryWarehouse::with_adc("my-project").await?;
//!
//! // Using a service account file
//! let backend = BigQueryWarehouse::from_service_account_key_file(
//!     "my-project",
//!     "/path/to/service-account.json"
//! ).await?;
//! ```
//!
//! Dataset and table mutation calls run under a bounded request deadline;
//! bulk inserts do not, since large chunks legitimately take long.

use crate::port::{BackendError, InsertOutcome, TableSpec, WarehouseBackend};
use async_trait::async_trait;
use tablesink_core::{Record, TableReference, TableSchema};

#[cfg(feature = "bigquery")]
use crate::port::RowError;

#[cfg(feature = "bigquery")]
use tablesink_core::{ColumnDef, ColumnMode, StorageType};

#[cfg(feature = "bigquery")]
use gcp_bigquery_client::{
    model::{
        clustering::Clustering, dataset::Dataset, query_request::QueryRequest, table::Table,
        table_data_insert_all_request::TableDataInsertAllRequest,
        table_field_schema::TableFieldSchema, table_schema::TableSchema as SdkTableSchema,
        time_partitioning::TimePartitioning,
    },
    Client as BigQueryClient,
};

#[cfg(feature = "bigquery")]
use std::time::Duration;

/// Deadline applied to dataset and table mutation calls
#[cfg(feature = "bigquery")]
const MUTATION_DEADLINE: Duration = Duration::from_secs(30);

/// BigQuery warehouse backend
pub struct BigQueryWarehouse {
    /// Project from the ambient credentials
    project_id: String,

    /// Location hint for dataset creation
    location: Option<String>,

    /// BigQuery client (only available with bigquery feature)
    #[cfg(feature = "bigquery")]
    client: BigQueryClient,

    /// Placeholder for when feature is disabled
    #[cfg(not(feature = "bigquery"))]
    _phantom: std::marker::PhantomData<()>,
}

impl BigQueryWarehouse {
    /// Wrap an already-authenticated client
    #[cfg(feature = "bigquery")]
    pub fn with_client(
        client: BigQueryClient,
        project_id: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location,
            client,
        }
    }

    /// Create a backend using Application Default Credentials (ADC)
    ///
    /// ADC automatically detects credentials from:
    /// - GOOGLE_APPLICATION_CREDENTIALS environment variable
    /// - gcloud CLI default credentials
    /// - GCE/GKE metadata service
    #[cfg(feature = "bigquery")]
    pub async fn with_adc(project_id: impl Into<String>) -> Result<Self, BackendError> {
        let project_id = project_id.into();

        let client = BigQueryClient::from_application_default_credentials()
            .await
            .map_err(|e| {
                BackendError::Auth(format!(
                    "Failed to authenticate with ADC: {}. \
                     Ensure GOOGLE_APPLICATION_CREDENTIALS is set or run \
                     'gcloud auth application-default login'",
                    e
                ))
            })?;

        Ok(Self {
            project_id,
            location: None,
            client,
        })
    }

    /// Create a backend without bigquery feature (returns error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn with_adc(project_id: impl Into<String>) -> Result<Self, BackendError> {
        let _ = project_id;
        Err(feature_disabled())
    }

    /// Create a backend using a service account key file
    #[cfg(feature = "bigquery")]
    pub async fn from_service_account_key_file(
        project_id: impl Into<String>,
        key_path: impl AsRef<std::path::Path>,
    ) -> Result<Self, BackendError> {
        let project_id = project_id.into();
        let key_path_str = key_path.as_ref().to_string_lossy().to_string();

        let client = BigQueryClient::from_service_account_key_file(&key_path_str)
            .await
            .map_err(|e| {
                BackendError::Auth(format!(
                    "Failed to read service account key file '{}': {}",
                    key_path_str, e
                ))
            })?;

        Ok(Self {
            project_id,
            location: None,
            client,
        })
    }

    /// Create a backend without bigquery feature (returns error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn from_service_account_key_file(
        project_id: impl Into<String>,
        _key_path: impl AsRef<std::path::Path>,
    ) -> Result<Self, BackendError> {
        let _ = project_id;
        Err(feature_disabled())
    }

    /// Set the location hint used when creating datasets
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[cfg(not(feature = "bigquery"))]
fn feature_disabled() -> BackendError {
    BackendError::Config(
        "BigQuery support not compiled. Rebuild with: cargo build --features bigquery".to_string(),
    )
}

/// Sort a backend fault into the port taxonomy from its response text.
fn classify_text(context: &str, text: &str) -> BackendError {
    let lower = text.to_lowercase();
    if lower.contains("already exists") || lower.contains("duplicate") {
        BackendError::AlreadyExists(format!("{context}: {text}"))
    } else if lower.contains("not found") || lower.contains("notfound") {
        BackendError::NotFound(format!("{context}: {text}"))
    } else if lower.contains("access denied")
        || lower.contains("permission")
        || lower.contains("unauthorized")
        || lower.contains("unauthenticated")
    {
        BackendError::Auth(format!("{context}: {text}"))
    } else if lower.contains("invalid") || lower.contains("bad request") {
        BackendError::InvalidRequest(format!("{context}: {text}"))
    } else {
        BackendError::Unavailable(format!("{context}: {text}"))
    }
}

#[cfg(feature = "bigquery")]
fn classify_error(context: &str, err: gcp_bigquery_client::error::BQError) -> BackendError {
    classify_text(context, &err.to_string())
}

/// Run a mutation call under the bounded deadline.
#[cfg(feature = "bigquery")]
async fn with_deadline<T, F>(context: &str, fut: F) -> Result<T, BackendError>
where
    F: std::future::Future<Output = Result<T, gcp_bigquery_client::error::BQError>>,
{
    match tokio::time::timeout(MUTATION_DEADLINE, fut).await {
        Ok(result) => result.map_err(|e| classify_error(context, e)),
        Err(_) => Err(BackendError::Unavailable(format!(
            "{context}: deadline of {}s exceeded",
            MUTATION_DEADLINE.as_secs()
        ))),
    }
}

/// Project a column definition onto the SDK schema type.
#[cfg(feature = "bigquery")]
fn to_sdk_field(column: &ColumnDef) -> Result<TableFieldSchema, BackendError> {
    let mut field = match column.storage_type {
        StorageType::Integer => TableFieldSchema::integer(&column.name),
        StorageType::Float => TableFieldSchema::float(&column.name),
        StorageType::String => TableFieldSchema::string(&column.name),
        StorageType::Bytes => TableFieldSchema::bytes(&column.name),
        StorageType::Date => TableFieldSchema::date(&column.name),
        StorageType::Time => TableFieldSchema::time(&column.name),
        StorageType::Datetime => TableFieldSchema::date_time(&column.name),
        StorageType::Boolean => TableFieldSchema::bool(&column.name),
        StorageType::Null => {
            return Err(BackendError::InvalidRequest(format!(
                "column '{}' resolves to NULL, which BigQuery cannot store",
                column.name
            )))
        }
    };
    field.mode = Some(column.mode.as_str().to_string());
    field.description = column.description.clone();
    Ok(field)
}

#[cfg(feature = "bigquery")]
fn from_sdk_field(field: &TableFieldSchema) -> ColumnDef {
    use gcp_bigquery_client::model::field_type::FieldType;

    let storage_type = match field.r#type {
        FieldType::Integer | FieldType::Int64 => StorageType::Integer,
        FieldType::Float | FieldType::Float64 => StorageType::Float,
        FieldType::Boolean | FieldType::Bool => StorageType::Boolean,
        FieldType::Bytes => StorageType::Bytes,
        FieldType::Date => StorageType::Date,
        FieldType::Time => StorageType::Time,
        FieldType::Datetime => StorageType::Datetime,
        // remaining SDK types have no tag in the framework's table; the
        // adaptor only needs names and positions for schema diffing
        _ => StorageType::String,
    };

    let mode = if field.mode.as_deref() == Some("REQUIRED") {
        ColumnMode::Required
    } else {
        ColumnMode::Nullable
    };

    ColumnDef {
        name: field.name.clone(),
        storage_type,
        mode,
        description: field.description.clone(),
    }
}

#[cfg(feature = "bigquery")]
fn to_sdk_schema(schema: &TableSchema) -> Result<SdkTableSchema, BackendError> {
    let fields = schema
        .columns
        .iter()
        .map(to_sdk_field)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SdkTableSchema::new(fields))
}

#[cfg(feature = "bigquery")]
fn from_sdk_schema(schema: &SdkTableSchema) -> TableSchema {
    let columns = schema
        .fields
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(from_sdk_field)
        .collect();
    TableSchema::from_columns(columns)
}

#[async_trait]
impl WarehouseBackend for BigQueryWarehouse {
    fn name(&self) -> &'static str {
        "BigQuery"
    }

    fn default_project(&self) -> &str {
        &self.project_id
    }

    #[cfg(feature = "bigquery")]
    async fn create_dataset(
        &self,
        project: &str,
        dataset: &str,
        location: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut request = Dataset::new(project, dataset);
        if let Some(location) = location.or(self.location.as_deref()) {
            request = request.location(location);
        }
        with_deadline(
            &format!("create dataset {project}.{dataset}"),
            self.client.dataset().create(request),
        )
        .await?;
        Ok(())
    }

    #[cfg(feature = "bigquery")]
    async fn create_table(
        &self,
        table: &TableReference,
        spec: &TableSpec,
    ) -> Result<(), BackendError> {
        let mut request = Table::new(
            &table.project,
            &table.dataset,
            &table.table,
            to_sdk_schema(&spec.schema)?,
        );

        if let Some(partition) = &spec.partition {
            let mut time_partitioning = TimePartitioning::per_day().field(&partition.field);
            time_partitioning.r#type = partition.granularity.as_str().to_string();
            request = request.time_partitioning(time_partitioning);
        }

        if !spec.clustering.is_empty() {
            request = request.clustering(Clustering {
                fields: Some(spec.clustering.clone()),
            });
        }

        if let Some(expires_at_ms) = spec.expires_at_ms {
            request.expiration_time = Some(expires_at_ms.to_string());
        }

        with_deadline(
            &format!("create table {table}"),
            self.client.table().create(request),
        )
        .await?;
        Ok(())
    }

    #[cfg(feature = "bigquery")]
    async fn get_table_schema(
        &self,
        table: &TableReference,
    ) -> Result<TableSchema, BackendError> {
        let current = with_deadline(
            &format!("get table {table}"),
            self.client
                .table()
                .get(&table.project, &table.dataset, &table.table, None),
        )
        .await?;
        Ok(from_sdk_schema(&current.schema))
    }

    #[cfg(feature = "bigquery")]
    async fn update_table_schema(
        &self,
        table: &TableReference,
        schema: &TableSchema,
    ) -> Result<TableSchema, BackendError> {
        let mut current = with_deadline(
            &format!("get table {table}"),
            self.client
                .table()
                .get(&table.project, &table.dataset, &table.table, None),
        )
        .await?;

        current.schema = to_sdk_schema(schema)?;
        let updated = with_deadline(
            &format!("update table {table}"),
            self.client
                .table()
                .update(&table.project, &table.dataset, &table.table, current),
        )
        .await?;
        Ok(from_sdk_schema(&updated.schema))
    }

    #[cfg(feature = "bigquery")]
    async fn delete_table(&self, table: &TableReference) -> Result<(), BackendError> {
        with_deadline(
            &format!("delete table {table}"),
            self.client
                .table()
                .delete(&table.project, &table.dataset, &table.table),
        )
        .await?;
        Ok(())
    }

    #[cfg(feature = "bigquery")]
    async fn insert_rows(
        &self,
        table: &TableReference,
        rows: &[Record],
    ) -> Result<InsertOutcome, BackendError> {
        let mut request = TableDataInsertAllRequest::new();
        for row in rows {
            request
                .add_row(None, row.clone())
                .map_err(|e| classify_error(&format!("encode rows for {table}"), e))?;
        }

        // no deadline here: large chunks legitimately take long
        let response = self
            .client
            .tabledata()
            .insert_all(&table.project, &table.dataset, &table.table, request)
            .await
            .map_err(|e| classify_error(&format!("insert into {table}"), e))?;

        let row_errors = response
            .insert_errors
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                let message = row
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                RowError {
                    index: row.index.unwrap_or(0) as usize,
                    message,
                }
            })
            .collect();

        Ok(InsertOutcome { row_errors })
    }

    #[cfg(feature = "bigquery")]
    async fn run_sql(&self, sql: &str) -> Result<(), BackendError> {
        self.client
            .job()
            .query(&self.project_id, QueryRequest::new(sql.to_string()))
            .await
            .map_err(|e| classify_error("run statement", e))?;
        Ok(())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn create_dataset(
        &self,
        _project: &str,
        _dataset: &str,
        _location: Option<&str>,
    ) -> Result<(), BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn create_table(
        &self,
        _table: &TableReference,
        _spec: &TableSpec,
    ) -> Result<(), BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn get_table_schema(
        &self,
        _table: &TableReference,
    ) -> Result<TableSchema, BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn update_table_schema(
        &self,
        _table: &TableReference,
        _schema: &TableSchema,
    ) -> Result<TableSchema, BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn delete_table(&self, _table: &TableReference) -> Result<(), BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn insert_rows(
        &self,
        _table: &TableReference,
        _rows: &[Record],
    ) -> Result<InsertOutcome, BackendError> {
        Err(feature_disabled())
    }

    #[cfg(not(feature = "bigquery"))]
    async fn run_sql(&self, _sql: &str) -> Result<(), BackendError> {
        Err(feature_disabled())
    }
}
