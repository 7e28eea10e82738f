use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "provider_name")]
    pub name: String,
    pub format: String,
    pub api_key: String,
    pub base_url: String,
    pub request_path: String,
    pub proxy_enabled: bool,
    pub valid: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sea_orm(has_many)]
    pub models: HasMany<super::models::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
