
use super::{EmbeddingRecord, SearchResult};
use crate::chunk::{Chunk, ChunkMetadata};
use crate::config::Config;
use crate::QaError;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

impl VectorStore {
    /// Create a new VectorStore instance rooted at the configured path.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, QaError> {
        let db_path = config
            .vector_db_path()
            .map_err(|e| QaError::Config(format!("Failed to get vector db path: {}", e)))?;
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                QaError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());

        // Attempt to connect with corruption recovery
        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                let error_msg = e.to_string().to_lowercase();
                if error_msg.contains("corrupt")
                    || error_msg.contains("invalid")
                    || error_msg.contains("malformed")
                {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(&db_path)?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        QaError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })?
                } else {
                    return Err(QaError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )));
                }
            }
        };

        let mut store = Self {
            connection,
            table_name: "chunks".to_string(),
            vector_dimension: None,
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Initialize the chunks table with the correct schema
    async fn initialize_table(&mut self) -> Result<(), QaError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("Chunks table already exists, detecting vector dimension");
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    self.vector_dimension = Some(dim);
                    info!("Detected existing vector dimension: {}", dim);
                }
                Err(e) => {
                    warn!(
                        "Could not detect vector dimension from existing table: {}",
                        e
                    );
                    self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
                }
            }
            return Ok(());
        }

        info!(
            "Creating chunks table with placeholder schema (recreated with correct dimensions on first insert)"
        );

        let schema = Self::create_schema(DEFAULT_VECTOR_DIMENSION);

        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
        Ok(())
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, QaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open existing table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| QaError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(QaError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("uuid", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("chunk_type", DataType::Utf8, false),
            Field::new("floor_location", DataType::Utf8, false),
            Field::new("category", DataType::Int64, true),
            Field::new("visualization_type", DataType::Utf8, true),
            Field::new("content", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store multiple embeddings in a batch
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), QaError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        // Auto-detect vector dimension from first record and recreate table
        // if needed
        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.recreate_table_with_dimension(vector_dim).await?;
            self.vector_dimension = Some(vector_dim);
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    /// Recreate table with new vector dimension
    async fn recreate_table_with_dimension(&self, vector_dim: usize) -> Result<(), QaError> {
        info!("Recreating table with vector dimension: {}", vector_dim);

        self.drop_table_if_exists().await?;

        let schema = Self::create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| {
                QaError::Database(format!("Failed to create table with new dimensions: {}", e))
            })?;

        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, QaError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| QaError::Database("Vector dimension not set".to_string()))?;

        let created_at = Utc::now().to_rfc3339();

        let mut ids = Vec::with_capacity(len);
        let mut uuids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut chunk_types = Vec::with_capacity(len);
        let mut floor_locations = Vec::with_capacity(len);
        let mut categories = Vec::with_capacity(len);
        let mut visualization_types = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut metadata_json = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            let metadata = &record.chunk.metadata;
            ids.push(record.id.as_str());
            uuids.push(metadata.uuid.as_deref());
            names.push(metadata.name.as_deref());
            chunk_types.push(metadata.chunk_type.to_string());
            floor_locations.push(metadata.floor_location.to_string());
            categories.push(metadata.category);
            visualization_types.push(metadata.visualization_type.as_deref());
            contents.push(record.chunk.content.as_str());
            metadata_json.push(serde_json::to_string(metadata).map_err(|e| {
                QaError::Database(format!("Failed to serialize chunk metadata: {}", e))
            })?);
            created_ats.push(created_at.as_str());
        }

        let schema = Self::create_schema(vector_dim);

        // Create vector array using FixedSizeListArray
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    QaError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(uuids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(chunk_types)),
            Arc::new(StringArray::from(floor_locations)),
            Arc::new(Int64Array::from(categories)),
            Arc::new(StringArray::from(visualization_types)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metadata_json)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| QaError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the chunks most similar to the query vector. Results come
    /// back ordered by similarity, the order the retrieval filter preserves.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, QaError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open table: {}", e)))?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| QaError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let results = query
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    /// Parse search results from LanceDB stream into SearchResult structs
    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, QaError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| QaError::Database(format!("Failed to read result stream: {}", e)))?
        {
            let parsed_batch = Self::parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, QaError> {
        let mut search_results = Vec::new();
        let num_rows = batch.num_rows();

        let contents = batch
            .column_by_name("content")
            .ok_or_else(|| QaError::Database("Missing content column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| QaError::Database("Invalid content column type".to_string()))?;

        let metadata_json = batch
            .column_by_name("metadata")
            .ok_or_else(|| QaError::Database("Missing metadata column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| QaError::Database("Invalid metadata column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..num_rows {
            let metadata: ChunkMetadata = serde_json::from_str(metadata_json.value(row))
                .map_err(|e| {
                    QaError::Database(format!("Failed to deserialize chunk metadata: {}", e))
                })?;

            let chunk = Chunk {
                content: contents.value(row).to_string(),
                metadata,
            };

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Convert distance to similarity score (higher is better)
            let similarity_score = 1.0 - distance;

            search_results.push(SearchResult {
                chunk,
                similarity_score,
                distance,
            });
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, QaError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Drop all stored embeddings and start over with an empty table.
    #[inline]
    pub async fn reset(&mut self) -> Result<(), QaError> {
        info!("Resetting vector store");
        self.drop_table_if_exists().await?;
        self.vector_dimension = None;
        self.initialize_table().await
    }

    /// Attempt to recover from database corruption
    fn attempt_corruption_recovery(db_path: &PathBuf) -> Result<(), QaError> {
        warn!("Attempting database corruption recovery at {:?}", db_path);

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {:?}", backup_path);
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                QaError::Database(format!("Failed to remove corrupted database: {}", e))
            })?;
        }

        info!("Database corruption recovery completed");
        Ok(())
    }

    /// Drop the chunks table if it exists
    async fn drop_table_if_exists(&self) -> Result<(), QaError> {
        let table_names =
            self.connection.table_names().execute().await.map_err(|e| {
                QaError::Database(format!("Failed to list tables for drop: {}", e))
            })?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing chunks table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| QaError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}
