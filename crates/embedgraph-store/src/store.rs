use std::path::{Path, PathBuf};

use embedgraph_core::{ChunkSimilarity, TextChunk};
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::fs;

use crate::schema::{
    INSERT_CHUNK, INSERT_SIMILARITY, SCHEMA, SELECT_CHUNKS, SELECT_SIMILARITIES,
    SELECT_SIMILARITIES_AT_LEAST,
};
use crate::{Result, StoreError};

const MAX_CONNECTIONS: u32 = 4;

#[derive(FromRow)]
struct ChunkRow {
    id: i64,
    text: String,
    chunk_index: i64,
    embedding: String,
    summary: String,
}

impl ChunkRow {
    fn into_chunk(self) -> Result<TextChunk> {
        let embedding = serde_json::from_str(&self.embedding).map_err(|source| {
            StoreError::Embedding {
                chunk: self.id,
                source,
            }
        })?;

        Ok(TextChunk {
            id: Some(self.id),
            text: self.text,
            chunk_index: self.chunk_index as usize,
            embedding,
            summary: self.summary,
        })
    }
}

#[derive(FromRow)]
struct SimilarityRow {
    id: i64,
    chunk_id_1: i64,
    chunk_id_2: i64,
    distance: f64,
    similarity: f64,
}

impl From<SimilarityRow> for ChunkSimilarity {
    fn from(row: SimilarityRow) -> Self {
        Self {
            id: Some(row.id),
            chunk_id_1: row.chunk_id_1,
            chunk_id_2: row.chunk_id_2,
            distance: row.distance,
            similarity: row.similarity,
        }
    }
}

/// Database file a run over `input_file` writes into `output_dir`.
pub fn database_path_for(input_file: &Path, output_dir: &Path) -> PathBuf {
    let stem = input_file
        .file_stem()
        .map_or_else(|| "input".into(), |stem| stem.to_string_lossy());
    output_dir.join(format!("{stem}_embeddings.db"))
}

/// Handle to one run's database.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Create a fresh database for `input_file` inside `output_dir`.
    ///
    /// The directory is created if needed. A database left by an earlier run
    /// over the same input is replaced so chunk ids start again at 1.
    ///
    /// # Errors
    /// Returns an error if the directory, file or tables cannot be created
    pub async fn create(input_file: &Path, output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir).await?;

        let path = database_path_for(input_file, output_dir);
        if fs::try_exists(&path).await? {
            tracing::warn!("Replacing existing database {}", path.display());
            fs::remove_file(&path).await?;
        }

        let pool = connect(&path, true).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        tracing::info!("Created database {}", path.display());
        Ok(Self { pool, path })
    }

    /// Open an existing database without creating anything.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the file is missing
    pub async fn open(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await? {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let pool = connect(path, false).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close every pooled connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Insert one chunk and record its new id on it.
    ///
    /// # Errors
    /// Returns an error if the embedding cannot be encoded or the insert fails
    pub async fn insert_chunk(&self, chunk: &mut TextChunk) -> Result<i64> {
        let embedding =
            serde_json::to_string(&chunk.embedding).map_err(|source| StoreError::Embedding {
                chunk: chunk.chunk_index as i64,
                source,
            })?;

        let id: i64 = sqlx::query_scalar(INSERT_CHUNK)
            .bind(&chunk.text)
            .bind(chunk.chunk_index as i64)
            .bind(embedding)
            .bind(&chunk.summary)
            .fetch_one(&self.pool)
            .await?;

        chunk.id = Some(id);
        Ok(id)
    }

    /// Insert chunks one after another in slice order.
    ///
    /// # Errors
    /// Stops at the first failing chunk; earlier ones stay stored
    pub async fn insert_chunks(&self, chunks: &mut [TextChunk]) -> Result<()> {
        for chunk in chunks.iter_mut() {
            self.insert_chunk(chunk).await?;
        }
        tracing::debug!("Stored {} chunks", chunks.len());
        Ok(())
    }

    /// All chunks ordered by chunk index, embeddings decoded.
    ///
    /// # Errors
    /// Returns an error if the query fails or an embedding cannot be parsed
    pub async fn all_chunks(&self) -> Result<Vec<TextChunk>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(SELECT_CHUNKS).fetch_all(&self.pool).await?;
        rows.into_iter().map(ChunkRow::into_chunk).collect()
    }

    /// Insert a single similarity record.
    ///
    /// # Errors
    /// Returns an error on constraint violation or database failure
    pub async fn insert_similarity(&self, record: &ChunkSimilarity) -> Result<()> {
        sqlx::query(INSERT_SIMILARITY)
            .bind(record.chunk_id_1)
            .bind(record.chunk_id_2)
            .bind(record.distance)
            .bind(record.similarity)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert every record in one transaction: either all are stored or none.
    ///
    /// # Errors
    /// Returns [`StoreError::Similarity`] naming the first pair that failed
    pub async fn insert_similarities(&self, records: &[ChunkSimilarity]) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        for record in records {
            sqlx::query(INSERT_SIMILARITY)
                .bind(record.chunk_id_1)
                .bind(record.chunk_id_2)
                .bind(record.distance)
                .bind(record.similarity)
                .execute(&mut *transaction)
                .await
                .map_err(|source| StoreError::Similarity {
                    first: record.chunk_id_1,
                    second: record.chunk_id_2,
                    source,
                })?;
        }

        transaction.commit().await?;
        tracing::debug!("Stored {} similarities", records.len());
        Ok(())
    }

    /// All similarity records, most similar first.
    ///
    /// # Errors
    /// Returns an error if the query fails
    pub async fn all_similarities(&self) -> Result<Vec<ChunkSimilarity>> {
        let rows: Vec<SimilarityRow> = sqlx::query_as(SELECT_SIMILARITIES)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ChunkSimilarity::from).collect())
    }

    /// Similarity records with `similarity >= min_similarity`, most similar
    /// first.
    ///
    /// # Errors
    /// Returns an error if the query fails
    pub async fn similarities_at_least(&self, min_similarity: f64) -> Result<Vec<ChunkSimilarity>> {
        let rows: Vec<SimilarityRow> = sqlx::query_as(SELECT_SIMILARITIES_AT_LEAST)
            .bind(min_similarity)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ChunkSimilarity::from).collect())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    Ok(pool)
}
