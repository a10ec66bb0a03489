use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller supplied an unusable payload (e.g. empty send).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced entity does not exist (or is tombstoned).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Store I/O failure.
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
