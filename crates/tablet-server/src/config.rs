use serde::Deserialize;

/// Server configuration: bind address, log level, and a capacity hint for
/// the engine's compile cache. Loaded from a TOML file with environment
/// overrides read at startup (`main.rs`), the way the teacher's
/// `config.rs` layers env vars over an on-disk config for the much larger
/// set of paths this spec's Non-goals exclude.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind_addr: default_bind_addr(), log_level: default_log_level() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ServerConfig {
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    /// Applies `TABLET_BIND_ADDR` / `TABLET_LOG_LEVEL` overrides on top of
    /// whatever the TOML file set.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TABLET_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("TABLET_LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_toml_file() {
        let cfg = ServerConfig::from_toml("bind_addr = \"0.0.0.0:9000\"\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg = ServerConfig::from_toml("").unwrap();
        assert_eq!(cfg, ServerConfig::default());
    }
}
