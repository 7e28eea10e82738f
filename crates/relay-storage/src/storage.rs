use async_trait::async_trait;

use crate::error::StorageResult;
use crate::record::{CompositeRecord, ModelRecord, ProviderRecord, SettingValue};

/// New-provider input; `id` and timestamps are assigned by storage.
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub request_path: String,
    pub format: relay_common::ProviderFormat,
    pub proxy_enabled: bool,
    pub valid: bool,
}

#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    pub model_id: String,
    pub provider_id: i64,
    pub model_type: relay_common::ModelType,
    pub format: relay_common::ProviderFormat,
    pub origin_reasoning: bool,
    pub origin_output: bool,
    pub valid: bool,
}

#[derive(Debug, Clone)]
pub struct NewComposite {
    pub name: String,
    pub reasoner_model_id: i64,
    pub general_model_id: i64,
    pub valid: bool,
}

/// Narrow repository interface over the persisted provider/model/composite/
/// settings tables (spec.md §6's "external collaborator"). The dispatcher
/// only ever reads through this trait; admin CRUD is the only writer.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Entity-first schema sync (SeaORM 2.0): creates tables/indexes that
    /// don't exist yet. Schema is append-only, so this never drops columns.
    async fn sync(&self) -> StorageResult<()>;

    /// True if `name` is unused across providers, models, and composites
    /// (the combined namespace), optionally excluding one record of `kind`.
    async fn name_is_available(
        &self,
        name: &str,
        exclude: Option<(crate::record::NamespaceKind, i64)>,
    ) -> StorageResult<bool>;

    async fn list_providers(&self) -> StorageResult<Vec<ProviderRecord>>;
    async fn get_provider(&self, id: i64) -> StorageResult<Option<ProviderRecord>>;
    async fn get_provider_by_name(&self, name: &str) -> StorageResult<Option<ProviderRecord>>;
    async fn create_provider(&self, input: NewProvider) -> StorageResult<ProviderRecord>;
    async fn update_provider(&self, id: i64, input: NewProvider) -> StorageResult<ProviderRecord>;
    /// Fails with `ProviderInUse` if any model still references this provider.
    async fn delete_provider(&self, id: i64) -> StorageResult<()>;

    async fn list_models(&self) -> StorageResult<Vec<ModelRecord>>;
    async fn get_model(&self, id: i64) -> StorageResult<Option<ModelRecord>>;
    async fn get_model_by_name(&self, name: &str) -> StorageResult<Option<ModelRecord>>;
    async fn create_model(&self, input: NewModel) -> StorageResult<ModelRecord>;
    async fn update_model(&self, id: i64, input: NewModel) -> StorageResult<ModelRecord>;
    /// Fails with `ModelInUse` if any composite still references this model.
    async fn delete_model(&self, id: i64) -> StorageResult<()>;

    async fn list_composites(&self) -> StorageResult<Vec<CompositeRecord>>;
    async fn get_composite(&self, id: i64) -> StorageResult<Option<CompositeRecord>>;
    async fn get_composite_by_name(&self, name: &str) -> StorageResult<Option<CompositeRecord>>;
    async fn create_composite(&self, input: NewComposite) -> StorageResult<CompositeRecord>;
    async fn update_composite(&self, id: i64, input: NewComposite)
    -> StorageResult<CompositeRecord>;
    async fn delete_composite(&self, id: i64) -> StorageResult<()>;

    async fn get_setting(&self, key: &str) -> StorageResult<Option<SettingValue>>;
    async fn set_setting(&self, key: &str, value: SettingValue) -> StorageResult<()>;
    async fn list_settings(&self) -> StorageResult<Vec<(String, SettingValue)>>;
}
