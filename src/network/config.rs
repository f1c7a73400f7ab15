use std::cell::RefCell;

/// Backend route configuration: the project base URL plus the anonymous API
/// key the hosted backend expects on every request.
#[derive(Clone)]
pub struct ApiConfig {
    base_url: String,
    anon_key: String,
}

impl Default for ApiConfig {
    /// Minimal default pointing at a local development stack. Only meant for
    /// unit tests and the short window before `init_api_config()` runs;
    /// production bootstrap must install the real values.
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: "dev-anon-key".to_string(),
        }
    }
}

impl ApiConfig {
    /// Build from the `BACKEND_URL` / `BACKEND_ANON_KEY` compile-time
    /// environment variables.
    pub fn from_env() -> Result<Self, &'static str> {
        match (option_env!("BACKEND_URL"), option_env!("BACKEND_ANON_KEY")) {
            (Some(url), Some(key)) => Ok(Self::from_parts(url, key)),
            _ => Err("BACKEND_URL / BACKEND_ANON_KEY are not set"),
        }
    }

    pub fn from_parts(url: &str, anon_key: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// URL of a table endpoint, e.g. `table_url("messages")`.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// URL of a stored-procedure endpoint.
    pub fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, name)
    }

    /// WebSocket URL of the push feed.
    pub fn ws_url(&self) -> String {
        let ws_base = if self.base_url.starts_with("https://") {
            self.base_url.replace("https://", "wss://")
        } else {
            self.base_url.replace("http://", "ws://")
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.anon_key
        )
    }
}

thread_local! {
    static API_CONFIG: RefCell<ApiConfig> = RefCell::new(ApiConfig::default());
}

/// Install the runtime configuration. Called once during bootstrap, before
/// any fetch or socket is opened.
pub fn init_api_config(config: ApiConfig) {
    API_CONFIG.with(|cell| *cell.borrow_mut() = config);
}

pub fn with_config<R>(f: impl FnOnce(&ApiConfig) -> R) -> R {
    API_CONFIG.with(|cell| f(&cell.borrow()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_derived_from_the_base() {
        let cfg = ApiConfig::from_parts("https://proj.example.co/", "key-123");
        assert_eq!(cfg.table_url("messages"), "https://proj.example.co/rest/v1/messages");
        assert_eq!(cfg.rpc_url("leaderboard"), "https://proj.example.co/rest/v1/rpc/leaderboard");
        assert!(cfg.ws_url().starts_with("wss://proj.example.co/realtime/v1/websocket"));
        assert!(cfg.ws_url().contains("apikey=key-123"));
    }
}
