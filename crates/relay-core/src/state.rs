use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use relay_provider_core::CancelRegistry;
use relay_storage::{SettingValue, Storage, setting_keys};
use tokio::sync::Mutex;

/// Process-wide shared state: the persisted store, the cancellation
/// registry, and the TCP pool, the latter rebuilt only on an explicit
/// settings reload (spec.md §4.4's "Rebuilt if the pool settings change").
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub cancel_registry: CancelRegistry,
    http_client: ArcSwap<wreq::Client>,
    proxied_clients: Mutex<HashMap<String, wreq::Client>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub limit: usize,
    pub limit_per_host: usize,
    pub keepalive_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            limit: 100,
            limit_per_host: 0,
            keepalive_timeout: Duration::from_secs(30),
        }
    }
}

impl AppState {
    pub async fn new(storage: Arc<dyn Storage>) -> Self {
        let pool_settings = load_pool_settings(storage.as_ref()).await;
        let http_client = build_http_client(pool_settings);
        Self {
            storage,
            cancel_registry: CancelRegistry::new(),
            http_client: ArcSwap::from_pointee(http_client),
            proxied_clients: Mutex::new(HashMap::new()),
        }
    }

    /// A cheap clone of the currently active shared client. Individual
    /// `UpstreamClient` implementations never close this pool.
    pub fn http_client(&self) -> wreq::Client {
        self.http_client.load().as_ref().clone()
    }

    /// The client a given provider should use: the shared pool verbatim
    /// when it has no proxy, or a proxy-scoped client cached by proxy
    /// string otherwise. A provider's `proxy_enabled=false` never routes
    /// through `proxy_address` — `proxy` being `None` is the only input
    /// that matters here, regardless of what the system setting holds.
    pub async fn http_client_for_proxy(&self, proxy: Option<&str>) -> wreq::Client {
        let Some(proxy) = proxy else {
            return self.http_client();
        };
        let mut cache = self.proxied_clients.lock().await;
        if let Some(client) = cache.get(proxy) {
            return client.clone();
        }
        let client = build_proxied_client(proxy);
        cache.insert(proxy.to_string(), client.clone());
        client
    }

    /// Rebuilds the shared pool from the latest system settings. Called
    /// only from the admin surface after a settings write — never on a
    /// per-request basis.
    pub async fn reload_http_client(&self) {
        let pool_settings = load_pool_settings(self.storage.as_ref()).await;
        self.http_client.store(Arc::new(build_http_client(pool_settings)));
    }
}

async fn load_pool_settings(storage: &(dyn Storage + '_)) -> PoolSettings {
    let mut settings = PoolSettings::default();
    if let Ok(Some(v)) = storage.get_setting(setting_keys::TCP_CONNECTOR_LIMIT).await {
        if let Some(n) = v.as_i64() {
            settings.limit = n.max(0) as usize;
        }
    }
    if let Ok(Some(v)) = storage
        .get_setting(setting_keys::TCP_CONNECTOR_LIMIT_PER_HOST)
        .await
    {
        if let Some(n) = v.as_i64() {
            settings.limit_per_host = n.max(0) as usize;
        }
    }
    if let Ok(Some(v)) = storage.get_setting(setting_keys::TCP_KEEPALIVE_TIMEOUT).await {
        if let Some(n) = v.as_i64() {
            settings.keepalive_timeout = Duration::from_secs(n.max(0) as u64);
        }
    }
    settings
}

/// Builds the single shared `wreq::Client` for the process. TLS stays on,
/// no force-close, cleanup-closed enabled — the defaults spec.md §4.4 names.
pub fn build_http_client(settings: PoolSettings) -> wreq::Client {
    let builder = wreq::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(if settings.limit_per_host == 0 {
            usize::MAX
        } else {
            settings.limit_per_host
        })
        .pool_idle_timeout(settings.keepalive_timeout)
        .tcp_keepalive(settings.keepalive_timeout);
    // `limit` (total pool size across all hosts) has no wreq builder
    // equivalent; only the per-host bound is wired through.
    let _ = settings.limit;
    builder.build().expect("static client configuration is always valid")
}

/// A one-off client scoped to a single proxy string, built with the same
/// baseline settings as the shared pool. Cached by `AppState` per distinct
/// proxy value so repeated requests through the same proxy reuse it.
fn build_proxied_client(proxy: &str) -> wreq::Client {
    let builder = wreq::Client::builder().connect_timeout(Duration::from_secs(10));
    match wreq::Proxy::all(proxy) {
        Ok(p) => builder.proxy(p).build(),
        Err(_) => builder.build(),
    }
    .expect("static client configuration is always valid")
}

/// Applies a provider's proxy setting onto a client builder, normalizing a
/// bare `host:port` into `http://host:port` when no scheme is present
/// (spec.md §4.4's "Client construction").
pub fn normalize_proxy_address(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

pub fn proxy_for_provider(
    provider: &relay_storage::ProviderRecord,
    proxy_address: Option<&SettingValue>,
) -> Option<String> {
    if !provider.proxy_enabled {
        return None;
    }
    proxy_address
        .and_then(SettingValue::as_str)
        .map(normalize_proxy_address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_host_port() {
        assert_eq!(normalize_proxy_address("127.0.0.1:1080"), "http://127.0.0.1:1080");
        assert_eq!(normalize_proxy_address("socks5://127.0.0.1:1080"), "socks5://127.0.0.1:1080");
    }

    #[test]
    fn proxy_disabled_never_returns_address() {
        let provider = relay_storage::ProviderRecord {
            id: 1,
            name: "p".into(),
            api_key: "k".into(),
            base_url: "https://api.example.com".into(),
            request_path: "v1/chat/completions".into(),
            format: relay_common::ProviderFormat::Openai,
            proxy_enabled: false,
            valid: true,
        };
        let setting = SettingValue::Str("127.0.0.1:1080".into());
        assert_eq!(proxy_for_provider(&provider, Some(&setting)), None);
    }
}
