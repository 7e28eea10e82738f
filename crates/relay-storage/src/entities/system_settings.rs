use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Typed key/value row. `value_kind` names which of `str|int|float|bool|json`
/// `value` (stored as JSON) actually holds, so callers can decode without
/// guessing from the JSON shape alone (a `"30"` string setting and a `30`
/// int setting must round-trip distinctly).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value_kind: String,
    pub value: Json,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
