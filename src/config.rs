use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_ADMIN_PASSWORD: &str = "ADMIN123";
pub const DEFAULT_CODE_PREFIX: &str = "NICE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote backend settings. An empty `supabase_url` selects the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn is_remote(&self) -> bool {
        !self.supabase_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Fallback master password when the stored app content does not set one.
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: None,
            code_prefix: default_code_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_path")]
    pub path: String,
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            path: default_outbox_path(),
            drain_interval_secs: default_drain_interval_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_code_prefix() -> String {
    DEFAULT_CODE_PREFIX.to_string()
}

fn default_outbox_path() -> String {
    "data/outbox.json".to_string()
}

fn default_drain_interval_secs() -> u64 {
    60
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 配置文件不存在时完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_defaults(),
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn from_defaults() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
            jwt: JwtConfig {
                secret: "change-me-in-production".to_string(),
                expires_in: 30 * 24 * 3600,
            },
            outbox: OutboxConfig::default(),
        }
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.store.supabase_url = v;
        }
        if let Ok(v) = env::var("SUPABASE_KEY") {
            self.store.supabase_key = v;
        }
        if let Ok(v) = env::var("STORE_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.store.timeout_secs = n;
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD")
            && !v.is_empty()
        {
            self.auth.admin_password = Some(v);
        }
        if let Ok(v) = env::var("CODE_PREFIX")
            && !v.is_empty()
        {
            self.auth.code_prefix = v;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.expires_in = n;
        }
        if let Ok(v) = env::var("OUTBOX_PATH") {
            self.outbox.path = v;
        }
        if let Ok(v) = env::var("OUTBOX_DRAIN_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.outbox.drain_interval_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [jwt]
            secret = "s3cret"
            expires_in = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(!config.store.is_remote());
        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.auth.code_prefix, "NICE");
        assert!(config.auth.admin_password.is_none());
        assert_eq!(config.outbox.path, "data/outbox.json");
        assert_eq!(config.outbox.drain_interval_secs, 60);
    }

    #[test]
    fn test_parse_remote_store() {
        let config = Config::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [store]
            supabase_url = "https://demo.supabase.co"
            supabase_key = "anon"

            [auth]
            admin_password = "OWNER-1"
            code_prefix = "EVT"

            [jwt]
            secret = "s"
            expires_in = 60
            "#,
        )
        .unwrap();

        assert!(config.store.is_remote());
        assert_eq!(config.auth.admin_password.as_deref(), Some("OWNER-1"));
        assert_eq!(config.auth.code_prefix, "EVT");
    }

    #[test]
    fn test_parse_rejects_missing_server() {
        assert!(Config::parse("[jwt]\nsecret = \"s\"\nexpires_in = 1\n").is_err());
    }
}
