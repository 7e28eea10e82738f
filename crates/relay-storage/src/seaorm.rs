use std::str::FromStr;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Schema,
};
use time::OffsetDateTime;

use relay_common::{ModelType, ProviderFormat};

use crate::entities;
use crate::error::{StorageError, StorageResult};
use crate::record::{
    CompositeRecord, ModelRecord, NamespaceKind, ProviderRecord, SettingValue,
};
use crate::storage::{NewComposite, NewModel, NewProvider, Storage};

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
}

impl SeaOrmStorage {
    pub async fn connect(dsn: &str) -> StorageResult<Self> {
        let db = crate::db::connect_shared(dsn).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn provider_from_model(m: entities::providers::Model) -> StorageResult<ProviderRecord> {
    Ok(ProviderRecord {
        id: m.id,
        name: m.name,
        api_key: m.api_key,
        base_url: m.base_url,
        request_path: m.request_path,
        format: ProviderFormat::from_str(&m.format)
            .map_err(|e| StorageError::InvalidSetting("format".into(), e))?,
        proxy_enabled: m.proxy_enabled,
        valid: m.valid,
    })
}

fn model_from_model(m: entities::models::Model) -> StorageResult<ModelRecord> {
    Ok(ModelRecord {
        id: m.id,
        name: m.name,
        model_id: m.model_id,
        provider_id: m.provider_id,
        model_type: ModelType::from_str(&m.model_type)
            .map_err(|e| StorageError::InvalidSetting("model_type".into(), e))?,
        format: ProviderFormat::from_str(&m.format)
            .map_err(|e| StorageError::InvalidSetting("format".into(), e))?,
        origin_reasoning: m.origin_reasoning,
        origin_output: m.origin_output,
        valid: m.valid,
    })
}

fn composite_from_model(m: entities::composite_models::Model) -> CompositeRecord {
    CompositeRecord {
        id: m.id,
        name: m.name,
        reasoner_model_id: m.reasoner_model_id,
        general_model_id: m.general_model_id,
        valid: m.valid,
    }
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn sync(&self) -> StorageResult<()> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::Providers)
            .register(entities::Models)
            .register(entities::CompositeModels)
            .register(entities::SystemSettings)
            .sync(&self.db)
            .await?;
        Ok(())
    }

    async fn name_is_available(
        &self,
        name: &str,
        exclude: Option<(NamespaceKind, i64)>,
    ) -> StorageResult<bool> {
        let excl_provider = matches!(exclude, Some((NamespaceKind::Provider, _)))
            .then(|| exclude.unwrap().1);
        let excl_model =
            matches!(exclude, Some((NamespaceKind::Model, _))).then(|| exclude.unwrap().1);
        let excl_composite =
            matches!(exclude, Some((NamespaceKind::Composite, _))).then(|| exclude.unwrap().1);

        let mut q = entities::Providers::find().filter(entities::providers::Column::Name.eq(name));
        if let Some(id) = excl_provider {
            q = q.filter(entities::providers::Column::Id.ne(id));
        }
        if q.count(&self.db).await? > 0 {
            return Ok(false);
        }

        let mut q = entities::Models::find().filter(entities::models::Column::Name.eq(name));
        if let Some(id) = excl_model {
            q = q.filter(entities::models::Column::Id.ne(id));
        }
        if q.count(&self.db).await? > 0 {
            return Ok(false);
        }

        let mut q = entities::CompositeModels::find()
            .filter(entities::composite_models::Column::Name.eq(name));
        if let Some(id) = excl_composite {
            q = q.filter(entities::composite_models::Column::Id.ne(id));
        }
        if q.count(&self.db).await? > 0 {
            return Ok(false);
        }

        Ok(true)
    }

    async fn list_providers(&self) -> StorageResult<Vec<ProviderRecord>> {
        entities::Providers::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(provider_from_model)
            .collect()
    }

    async fn get_provider(&self, id: i64) -> StorageResult<Option<ProviderRecord>> {
        match entities::Providers::find_by_id(id).one(&self.db).await? {
            Some(m) => Ok(Some(provider_from_model(m)?)),
            None => Ok(None),
        }
    }

    async fn get_provider_by_name(&self, name: &str) -> StorageResult<Option<ProviderRecord>> {
        match entities::Providers::find()
            .filter(entities::providers::Column::Name.eq(name))
            .one(&self.db)
            .await?
        {
            Some(m) => Ok(Some(provider_from_model(m)?)),
            None => Ok(None),
        }
    }

    async fn create_provider(&self, input: NewProvider) -> StorageResult<ProviderRecord> {
        if !self.name_is_available(&input.name, None).await? {
            return Err(StorageError::NameTaken(input.name));
        }
        let now = OffsetDateTime::now_utc();
        let am = entities::providers::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(input.name),
            format: ActiveValue::Set(input.format.as_str().to_string()),
            api_key: ActiveValue::Set(input.api_key),
            base_url: ActiveValue::Set(input.base_url),
            request_path: ActiveValue::Set(input.request_path),
            proxy_enabled: ActiveValue::Set(input.proxy_enabled),
            valid: ActiveValue::Set(input.valid),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let model = am.insert(&self.db).await?;
        provider_from_model(model)
    }

    async fn update_provider(&self, id: i64, input: NewProvider) -> StorageResult<ProviderRecord> {
        if !self
            .name_is_available(&input.name, Some((NamespaceKind::Provider, id)))
            .await?
        {
            return Err(StorageError::NameTaken(input.name));
        }
        let existing = entities::Providers::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("provider {id}")))?;
        let mut am: entities::providers::ActiveModel = existing.into();
        am.name = ActiveValue::Set(input.name);
        am.format = ActiveValue::Set(input.format.as_str().to_string());
        am.api_key = ActiveValue::Set(input.api_key);
        am.base_url = ActiveValue::Set(input.base_url);
        am.request_path = ActiveValue::Set(input.request_path);
        am.proxy_enabled = ActiveValue::Set(input.proxy_enabled);
        am.valid = ActiveValue::Set(input.valid);
        am.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        let model = am.update(&self.db).await?;
        provider_from_model(model)
    }

    async fn delete_provider(&self, id: i64) -> StorageResult<()> {
        let dependents = entities::Models::find()
            .filter(entities::models::Column::ProviderId.eq(id))
            .count(&self.db)
            .await?;
        if dependents > 0 {
            return Err(StorageError::ProviderInUse(
                format!("provider {id}"),
                dependents,
            ));
        }
        entities::Providers::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn list_models(&self) -> StorageResult<Vec<ModelRecord>> {
        entities::Models::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_from_model)
            .collect()
    }

    async fn get_model(&self, id: i64) -> StorageResult<Option<ModelRecord>> {
        match entities::Models::find_by_id(id).one(&self.db).await? {
            Some(m) => Ok(Some(model_from_model(m)?)),
            None => Ok(None),
        }
    }

    async fn get_model_by_name(&self, name: &str) -> StorageResult<Option<ModelRecord>> {
        match entities::Models::find()
            .filter(entities::models::Column::Name.eq(name))
            .one(&self.db)
            .await?
        {
            Some(m) => Ok(Some(model_from_model(m)?)),
            None => Ok(None),
        }
    }

    async fn create_model(&self, input: NewModel) -> StorageResult<ModelRecord> {
        if !self.name_is_available(&input.name, None).await? {
            return Err(StorageError::NameTaken(input.name));
        }
        if entities::Providers::find_by_id(input.provider_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(StorageError::NotFound(format!(
                "provider {}",
                input.provider_id
            )));
        }
        let now = OffsetDateTime::now_utc();
        let am = entities::models::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(input.name),
            model_id: ActiveValue::Set(input.model_id),
            provider_id: ActiveValue::Set(input.provider_id),
            model_type: ActiveValue::Set(input.model_type.as_str().to_string()),
            format: ActiveValue::Set(input.format.as_str().to_string()),
            origin_reasoning: ActiveValue::Set(input.origin_reasoning),
            origin_output: ActiveValue::Set(input.origin_output),
            valid: ActiveValue::Set(input.valid),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let model = am.insert(&self.db).await?;
        model_from_model(model)
    }

    async fn update_model(&self, id: i64, input: NewModel) -> StorageResult<ModelRecord> {
        if !self
            .name_is_available(&input.name, Some((NamespaceKind::Model, id)))
            .await?
        {
            return Err(StorageError::NameTaken(input.name));
        }
        let existing = entities::Models::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("model {id}")))?;
        let mut am: entities::models::ActiveModel = existing.into();
        am.name = ActiveValue::Set(input.name);
        am.model_id = ActiveValue::Set(input.model_id);
        am.provider_id = ActiveValue::Set(input.provider_id);
        am.model_type = ActiveValue::Set(input.model_type.as_str().to_string());
        am.format = ActiveValue::Set(input.format.as_str().to_string());
        am.origin_reasoning = ActiveValue::Set(input.origin_reasoning);
        am.origin_output = ActiveValue::Set(input.origin_output);
        am.valid = ActiveValue::Set(input.valid);
        am.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        let model = am.update(&self.db).await?;
        model_from_model(model)
    }

    async fn delete_model(&self, id: i64) -> StorageResult<()> {
        let dependents = entities::CompositeModels::find()
            .filter(
                Condition::any()
                    .add(entities::composite_models::Column::ReasonerModelId.eq(id))
                    .add(entities::composite_models::Column::GeneralModelId.eq(id)),
            )
            .count(&self.db)
            .await?;
        if dependents > 0 {
            return Err(StorageError::ModelInUse(format!("model {id}")));
        }
        entities::Models::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn list_composites(&self) -> StorageResult<Vec<CompositeRecord>> {
        Ok(entities::CompositeModels::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(composite_from_model)
            .collect())
    }

    async fn get_composite(&self, id: i64) -> StorageResult<Option<CompositeRecord>> {
        Ok(entities::CompositeModels::find_by_id(id)
            .one(&self.db)
            .await?
            .map(composite_from_model))
    }

    async fn get_composite_by_name(&self, name: &str) -> StorageResult<Option<CompositeRecord>> {
        Ok(entities::CompositeModels::find()
            .filter(entities::composite_models::Column::Name.eq(name))
            .one(&self.db)
            .await?
            .map(composite_from_model))
    }

    async fn create_composite(&self, input: NewComposite) -> StorageResult<CompositeRecord> {
        if !self.name_is_available(&input.name, None).await? {
            return Err(StorageError::NameTaken(input.name));
        }
        for id in [input.reasoner_model_id, input.general_model_id] {
            if entities::Models::find_by_id(id).one(&self.db).await?.is_none() {
                return Err(StorageError::NotFound(format!("model {id}")));
            }
        }
        let now = OffsetDateTime::now_utc();
        let am = entities::composite_models::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(input.name),
            reasoner_model_id: ActiveValue::Set(input.reasoner_model_id),
            general_model_id: ActiveValue::Set(input.general_model_id),
            valid: ActiveValue::Set(input.valid),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let model = am.insert(&self.db).await?;
        Ok(composite_from_model(model))
    }

    async fn update_composite(
        &self,
        id: i64,
        input: NewComposite,
    ) -> StorageResult<CompositeRecord> {
        if !self
            .name_is_available(&input.name, Some((NamespaceKind::Composite, id)))
            .await?
        {
            return Err(StorageError::NameTaken(input.name));
        }
        let existing = entities::CompositeModels::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("composite {id}")))?;
        let mut am: entities::composite_models::ActiveModel = existing.into();
        am.name = ActiveValue::Set(input.name);
        am.reasoner_model_id = ActiveValue::Set(input.reasoner_model_id);
        am.general_model_id = ActiveValue::Set(input.general_model_id);
        am.valid = ActiveValue::Set(input.valid);
        am.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        let model = am.update(&self.db).await?;
        Ok(composite_from_model(model))
    }

    async fn delete_composite(&self, id: i64) -> StorageResult<()> {
        entities::CompositeModels::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> StorageResult<Option<SettingValue>> {
        match entities::SystemSettings::find_by_id(key.to_string())
            .one(&self.db)
            .await?
        {
            Some(row) => Ok(SettingValue::from_kind_and_json(&row.value_kind, row.value)),
            None => Ok(None),
        }
    }

    async fn set_setting(&self, key: &str, value: SettingValue) -> StorageResult<()> {
        let now = OffsetDateTime::now_utc();
        let existing = entities::SystemSettings::find_by_id(key.to_string())
            .one(&self.db)
            .await?;
        let am = match existing {
            Some(row) => {
                let mut am: entities::system_settings::ActiveModel = row.into();
                am.value_kind = ActiveValue::Set(value.kind_str().to_string());
                am.value = ActiveValue::Set(value.to_json());
                am.updated_at = ActiveValue::Set(now);
                am
            }
            None => entities::system_settings::ActiveModel {
                key: ActiveValue::Set(key.to_string()),
                value_kind: ActiveValue::Set(value.kind_str().to_string()),
                value: ActiveValue::Set(value.to_json()),
                updated_at: ActiveValue::Set(now),
            },
        };
        am.save(&self.db).await?;
        Ok(())
    }

    async fn list_settings(&self) -> StorageResult<Vec<(String, SettingValue)>> {
        Ok(entities::SystemSettings::find()
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|row| {
                SettingValue::from_kind_and_json(&row.value_kind, row.value)
                    .map(|v| (row.key, v))
            })
            .collect())
    }
}
