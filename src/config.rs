use serde::Deserialize;
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Sessions generated at startup to seed the demo dataset. 0 = start
    /// empty and rely on submitted sessions.
    #[serde(default = "default_demo_sessions")]
    pub demo_sessions: usize,
    /// Sessions appended by the periodic demo batch task.
    #[serde(default = "default_demo_batch_size")]
    pub demo_batch_size: usize,
    /// Seconds between demo batches. 0 = no periodic generation.
    #[serde(default = "default_demo_interval_secs")]
    pub demo_interval_secs: u64,
    /// Seed for the demo generator. Unset = seeded from the OS.
    #[serde(default)]
    pub demo_seed: Option<u64>,
    /// Maximum sessions accepted in one submission batch.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_demo_sessions() -> usize {
    500
}

const fn default_demo_batch_size() -> usize {
    5
}

const fn default_demo_interval_secs() -> u64 {
    10
}

const fn default_batch_limit() -> usize {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            demo_sessions: default_demo_sessions(),
            demo_batch_size: default_demo_batch_size(),
            demo_interval_secs: default_demo_interval_secs(),
            demo_seed: None,
            batch_limit: default_batch_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `FUNNEL_HOST` → host
    /// - `FUNNEL_PORT` → port
    /// - `FUNNEL_DEMO_SESSIONS` → demo_sessions
    /// - `FUNNEL_DEMO_BATCH_SIZE` → demo_batch_size
    /// - `FUNNEL_DEMO_INTERVAL` → demo_interval_secs
    /// - `FUNNEL_DEMO_SEED` → demo_seed
    /// - `FUNNEL_BATCH_LIMIT` → batch_limit
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(host) = std::env::var("FUNNEL_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("FUNNEL_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(val) = std::env::var("FUNNEL_DEMO_SESSIONS") {
            if let Ok(n) = val.parse() {
                config.demo_sessions = n;
            }
        }
        if let Ok(val) = std::env::var("FUNNEL_DEMO_BATCH_SIZE") {
            if let Ok(n) = val.parse() {
                config.demo_batch_size = n;
            }
        }
        if let Ok(val) = std::env::var("FUNNEL_DEMO_INTERVAL") {
            if let Ok(secs) = val.parse() {
                config.demo_interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("FUNNEL_DEMO_SEED") {
            if let Ok(seed) = val.parse() {
                config.demo_seed = Some(seed);
            }
        }
        if let Ok(val) = std::env::var("FUNNEL_BATCH_LIMIT") {
            if let Ok(n) = val.parse() {
                config.batch_limit = n;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Mutex to serialize tests that call `Config::load`, which reads
    /// environment variables. Without this, `test_env_var_overrides` can
    /// pollute other tests running in parallel.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.demo_sessions, 500);
        assert_eq!(config.demo_batch_size, 5);
        assert_eq!(config.demo_interval_secs, 10);
        assert!(config.demo_seed.is_none());
        assert_eq!(config.batch_limit, 10_000);
    }

    #[test]
    fn test_load_from_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
host = "127.0.0.1"
port = 9000
demo_sessions = 1000
demo_batch_size = 20
demo_interval_secs = 5
demo_seed = 42
batch_limit = 500
"#
        )
        .unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.demo_sessions, 1000);
        assert_eq!(config.demo_batch_size, 20);
        assert_eq!(config.demo_interval_secs, 5);
        assert_eq!(config.demo_seed, Some(42));
        assert_eq!(config.batch_limit, 500);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_load_no_path_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(None);
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_env_var_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();

        // Save original values
        let orig_port = std::env::var("FUNNEL_PORT").ok();

        std::env::set_var("FUNNEL_PORT", "3000");
        let config = Config::load(None);
        assert_eq!(config.port, 3000);

        // Restore
        match orig_port {
            Some(v) => std::env::set_var("FUNNEL_PORT", v),
            None => std::env::remove_var("FUNNEL_PORT"),
        }
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "this is not valid toml {{{").unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.port, 8000);
    }
}
