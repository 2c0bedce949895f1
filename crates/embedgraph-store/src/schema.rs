pub(crate) const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS text_chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        embedding TEXT NOT NULL,
        summary TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS chunk_similarities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chunk_id_1 INTEGER NOT NULL,
        chunk_id_2 INTEGER NOT NULL,
        distance REAL NOT NULL,
        similarity REAL NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (chunk_id_1) REFERENCES text_chunks (id),
        FOREIGN KEY (chunk_id_2) REFERENCES text_chunks (id),
        UNIQUE (chunk_id_1, chunk_id_2)
    )",
    "CREATE INDEX IF NOT EXISTS idx_similarities_chunk1 ON chunk_similarities (chunk_id_1)",
    "CREATE INDEX IF NOT EXISTS idx_similarities_chunk2 ON chunk_similarities (chunk_id_2)",
    "CREATE INDEX IF NOT EXISTS idx_similarities_distance ON chunk_similarities (distance)",
];

pub(crate) const INSERT_CHUNK: &str = "INSERT INTO text_chunks (text, chunk_index, embedding, summary) \
     VALUES (?, ?, ?, ?) RETURNING id";

pub(crate) const SELECT_CHUNKS: &str =
    "SELECT id, text, chunk_index, embedding, summary FROM text_chunks ORDER BY chunk_index";

pub(crate) const INSERT_SIMILARITY: &str = "INSERT INTO chunk_similarities \
     (chunk_id_1, chunk_id_2, distance, similarity) VALUES (?, ?, ?, ?)";

pub(crate) const SELECT_SIMILARITIES: &str = "SELECT id, chunk_id_1, chunk_id_2, distance, similarity \
     FROM chunk_similarities ORDER BY similarity DESC";

pub(crate) const SELECT_SIMILARITIES_AT_LEAST: &str = "SELECT id, chunk_id_1, chunk_id_2, distance, similarity \
     FROM chunk_similarities WHERE similarity >= ? ORDER BY similarity DESC";
