use relay_storage::{Storage, setting_keys};

/// Why a bearer check failed, distinct from a `DispatchError` since it's
/// never about request shape — `relay-router`'s middleware maps both
/// variants to 401.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingHeader,
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("no api_key system setting is configured")]
    Unconfigured,
}

/// Checks `Authorization: Bearer <token>` against the single system-wide
/// `api_key` setting (spec.md §6 — one token, not a multi-user key table).
pub async fn check_bearer_token(
    storage: &dyn Storage,
    authorization_header: Option<&str>,
) -> Result<(), AuthError> {
    let presented = authorization_header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let configured = storage
        .get_setting(setting_keys::API_KEY)
        .await
        .ok()
        .flatten()
        .and_then(|setting| setting.as_str().map(str::to_string))
        .ok_or(AuthError::Unconfigured)?;

    if presented == configured {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_storage::{NewComposite, NewModel, NewProvider, StorageResult};

    struct FixedStorage(Option<String>);

    #[async_trait::async_trait]
    impl Storage for FixedStorage {
        async fn sync(&self) -> StorageResult<()> {
            Ok(())
        }
        async fn name_is_available(
            &self,
            _name: &str,
            _exclude: Option<(relay_storage::NamespaceKind, i64)>,
        ) -> StorageResult<bool> {
            Ok(true)
        }
        async fn list_providers(&self) -> StorageResult<Vec<relay_storage::ProviderRecord>> {
            Ok(vec![])
        }
        async fn get_provider(&self, _id: i64) -> StorageResult<Option<relay_storage::ProviderRecord>> {
            Ok(None)
        }
        async fn get_provider_by_name(&self, _name: &str) -> StorageResult<Option<relay_storage::ProviderRecord>> {
            Ok(None)
        }
        async fn create_provider(&self, _input: NewProvider) -> StorageResult<relay_storage::ProviderRecord> {
            unimplemented!()
        }
        async fn update_provider(&self, _id: i64, _input: NewProvider) -> StorageResult<relay_storage::ProviderRecord> {
            unimplemented!()
        }
        async fn delete_provider(&self, _id: i64) -> StorageResult<()> {
            Ok(())
        }
        async fn list_models(&self) -> StorageResult<Vec<relay_storage::ModelRecord>> {
            Ok(vec![])
        }
        async fn get_model(&self, _id: i64) -> StorageResult<Option<relay_storage::ModelRecord>> {
            Ok(None)
        }
        async fn get_model_by_name(&self, _name: &str) -> StorageResult<Option<relay_storage::ModelRecord>> {
            Ok(None)
        }
        async fn create_model(&self, _input: NewModel) -> StorageResult<relay_storage::ModelRecord> {
            unimplemented!()
        }
        async fn update_model(&self, _id: i64, _input: NewModel) -> StorageResult<relay_storage::ModelRecord> {
            unimplemented!()
        }
        async fn delete_model(&self, _id: i64) -> StorageResult<()> {
            Ok(())
        }
        async fn list_composites(&self) -> StorageResult<Vec<relay_storage::CompositeRecord>> {
            Ok(vec![])
        }
        async fn get_composite(&self, _id: i64) -> StorageResult<Option<relay_storage::CompositeRecord>> {
            Ok(None)
        }
        async fn get_composite_by_name(&self, _name: &str) -> StorageResult<Option<relay_storage::CompositeRecord>> {
            Ok(None)
        }
        async fn create_composite(&self, _input: NewComposite) -> StorageResult<relay_storage::CompositeRecord> {
            unimplemented!()
        }
        async fn update_composite(&self, _id: i64, _input: NewComposite) -> StorageResult<relay_storage::CompositeRecord> {
            unimplemented!()
        }
        async fn delete_composite(&self, _id: i64) -> StorageResult<()> {
            Ok(())
        }
        async fn get_setting(&self, key: &str) -> StorageResult<Option<relay_storage::SettingValue>> {
            if key == setting_keys::API_KEY {
                Ok(self.0.clone().map(relay_storage::SettingValue::Str))
            } else {
                Ok(None)
            }
        }
        async fn set_setting(&self, _key: &str, _value: relay_storage::SettingValue) -> StorageResult<()> {
            Ok(())
        }
        async fn list_settings(&self) -> StorageResult<Vec<(String, relay_storage::SettingValue)>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let storage = FixedStorage(Some("secret".into()));
        let err = check_bearer_token(&storage, None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingHeader));
    }

    #[tokio::test]
    async fn rejects_wrong_token() {
        let storage = FixedStorage(Some("secret".into()));
        let err = check_bearer_token(&storage, Some("Bearer wrong")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn accepts_matching_token() {
        let storage = FixedStorage(Some("secret".into()));
        check_bearer_token(&storage, Some("Bearer secret")).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_when_unconfigured() {
        let storage = FixedStorage(None);
        let err = check_bearer_token(&storage, Some("Bearer anything")).await.unwrap_err();
        assert!(matches!(err, AuthError::Unconfigured));
    }
}
