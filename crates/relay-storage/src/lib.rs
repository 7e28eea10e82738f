pub mod db;
pub mod entities;
mod error;
mod record;
mod seaorm;
mod storage;

pub use error::{StorageError, StorageResult};
pub use record::{
    CompositeRecord, ModelRecord, NamespaceKind, ProviderRecord, SettingValue, setting_keys,
};
pub use seaorm::SeaOrmStorage;
pub use storage::{NewComposite, NewModel, NewProvider, Storage};
