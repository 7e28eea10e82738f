#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("db error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("name already in use: {0}")]
    NameTaken(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0} has {1} dependent model(s) and cannot be deleted")]
    ProviderInUse(String, u64),
    #[error("model '{0}' is referenced by a composite and cannot be deleted")]
    ModelInUse(String),
    #[error("invalid system setting value for '{0}': {1}")]
    InvalidSetting(String, String),
}

pub type StorageResult<T> = Result<T, StorageError>;
