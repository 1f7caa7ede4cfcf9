use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table not found: {0}")]
    MissingTable(String),

    #[error("Schema creation failed for {table}: {reason}")]
    SchemaFailed { table: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
