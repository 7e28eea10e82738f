use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use relay_storage::{SeaOrmStorage, Storage, setting_keys};

use crate::state::AppState;

#[derive(Debug, Clone, Parser)]
#[command(name = "relay", version, about = "A reasoning-composite chat-completion gateway")]
pub struct CliArgs {
    /// Database DSN (required to bootstrap the rest of the process).
    #[arg(long, env = "RELAY_DSN")]
    pub dsn: Option<String>,

    /// Bind host.
    #[arg(long, env = "RELAY_HOST")]
    pub host: Option<String>,

    /// Bind port.
    #[arg(long, env = "RELAY_PORT")]
    pub port: Option<String>,

    /// Bearer token the public `/v1/*` surface checks against. Seeded into
    /// the `api_key` system setting on first boot if none is persisted yet.
    #[arg(long, env = "RELAY_API_KEY")]
    pub api_key: Option<String>,
}

pub struct Bootstrap {
    pub storage: Arc<SeaOrmStorage>,
    pub state: Arc<AppState>,
    pub host: String,
    pub port: u16,
}

pub async fn bootstrap_from_env() -> anyhow::Result<Bootstrap> {
    bootstrap(CliArgs::parse()).await
}

pub async fn bootstrap(args: CliArgs) -> anyhow::Result<Bootstrap> {
    let dsn = sanitize_optional(args.dsn).unwrap_or_else(default_dsn);
    let host = sanitize_optional(args.host).unwrap_or_else(|| "0.0.0.0".to_string());
    let port = match sanitize_optional(args.port) {
        Some(raw) => raw.parse::<u16>().with_context(|| format!("invalid RELAY_PORT value: {raw}"))?,
        None => 8080,
    };
    let api_key = sanitize_optional(args.api_key);

    ensure_sqlite_parent_dir(&dsn)?;

    let storage = Arc::new(SeaOrmStorage::connect(&dsn).await.context("connect storage")?);
    storage.sync().await.context("schema sync")?;

    if let Some(api_key) = api_key {
        storage
            .set_setting(setting_keys::API_KEY, relay_storage::SettingValue::Str(api_key))
            .await
            .context("seed api_key setting")?;
    } else if storage.get_setting(setting_keys::API_KEY).await?.is_none() {
        tracing::warn!(
            "no api_key configured (set RELAY_API_KEY or an api_key system setting) — \
             every /v1/* request will be rejected until one is set"
        );
    }

    let state = Arc::new(AppState::new(storage.clone() as Arc<dyn Storage>).await);

    Ok(Bootstrap {
        storage,
        state,
        host,
        port,
    })
}

fn sanitize_optional(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

fn default_dsn() -> String {
    if let Some(data_dir) = sanitize_optional(std::env::var("RELAY_DATA_DIR").ok()) {
        let dir = data_dir.trim_end_matches('/');
        return format!("sqlite://{dir}/relay.db?mode=rwc");
    }
    "sqlite://relay.db?mode=rwc".to_string()
}

fn ensure_sqlite_parent_dir(dsn: &str) -> anyhow::Result<()> {
    let Some(db_path) = sqlite_file_path_from_dsn(dsn) else {
        return Ok(());
    };
    let Some(parent) = db_path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create sqlite parent dir {}", parent.display()))?;
    Ok(())
}

fn sqlite_file_path_from_dsn(dsn: &str) -> Option<PathBuf> {
    let rest = dsn.strip_prefix("sqlite:")?;
    let path_part = rest.split(['?', '#']).next()?.trim();
    if path_part.is_empty() {
        return None;
    }
    let mut normalized = path_part;
    if let Some(stripped) = normalized.strip_prefix("//") {
        normalized = stripped;
    }
    if normalized.to_ascii_lowercase() == ":memory:" {
        return None;
    }
    Some(PathBuf::from(normalized))
}

#[cfg(test)]
mod tests {
    use super::sqlite_file_path_from_dsn;

    #[test]
    fn sqlite_dsn_resolves_relative_path() {
        let path = sqlite_file_path_from_dsn("sqlite://relay.db?mode=rwc").unwrap();
        assert_eq!(path.to_string_lossy(), "relay.db");
    }

    #[test]
    fn sqlite_dsn_resolves_absolute_path() {
        let path = sqlite_file_path_from_dsn("sqlite://app/data/relay.db?mode=rwc").unwrap();
        assert_eq!(path.to_string_lossy(), "/app/data/relay.db");
    }

    #[test]
    fn sqlite_memory_dsn_is_ignored() {
        assert!(sqlite_file_path_from_dsn("sqlite::memory:").is_none());
        assert!(sqlite_file_path_from_dsn("sqlite://:memory:").is_none());
    }
}
