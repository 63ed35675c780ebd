//! Process-start configuration, grounded on `ckb-app-config`'s layering of
//! a bundled TOML template plus CLI overrides, adapted to fincore's need
//! for a 32-byte AES key, a database URL and a trusted gateway address
//! (spec.md §6 "Environment contract").

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

mod argon2_params;
pub use argon2_params::Argon2Params;

const ENV_PREFIX: &str = "FINCORE_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing required setting {0}; the card vault refuses to start without it")]
    Missing(&'static str),
    #[error("{0} must decode to exactly 32 bytes, got {1}")]
    BadAesKeyLength(&'static str, usize),
    #[error("{0} is not valid base64: {1}")]
    BadBase64(&'static str, base64::DecodeError),
}

/// Defaults applied to a freshly created user or card when the caller
/// supplies none (spec.md §4.5 "Create").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DefaultLimits {
    pub daily_cents: i64,
    pub monthly_cents: i64,
}

impl Default for DefaultLimits {
    fn default() -> Self {
        // Card defaults from spec.md §4.5: daily 5 000,00 / monthly 50 000,00.
        Self {
            daily_cents: 500_000,
            monthly_cents: 5_000_000,
        }
    }
}

/// Fully resolved runtime configuration. Built by [`Config::load`]; never
/// mutated after startup (spec.md §5 "Global state").
#[derive(Debug, Clone)]
pub struct Config {
    pub aes_key: [u8; 32],
    pub database_url: String,
    pub trusted_gateway_addr: String,
    pub bind_address: String,
    pub argon2: Argon2Params,
    pub default_card_limits: DefaultLimits,
    pub default_user_daily_limit_cents: i64,
    pub default_user_monthly_limit_cents: i64,
    pub db_pool_size: u32,
}

/// The subset of [`Config`] that can be expressed in a TOML file; the AES
/// key and database URL are deliberately excluded from the file format and
/// must come from the environment, so they never end up committed to a
/// config repo by accident.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    bind_address: Option<String>,
    argon2_time_cost: Option<u32>,
    argon2_memory_kib: Option<u32>,
    argon2_parallelism: Option<u32>,
    default_card_daily_limit_cents: Option<i64>,
    default_card_monthly_limit_cents: Option<i64>,
    default_user_daily_limit_cents: Option<i64>,
    default_user_monthly_limit_cents: Option<i64>,
    db_pool_size: Option<u32>,
}

/// CLI flags, layered over file and environment config (highest
/// precedence), mirroring `ckb-app-config`'s use of `clap` for operator
/// overrides.
#[derive(Debug, Parser)]
#[command(name = "fincore", about = "fincore transactional money engine")]
pub struct Cli {
    /// Path to an optional TOML config file.
    #[arg(long, env = "FINCORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP API to.
    #[arg(long, env = "FINCORE_BIND_ADDRESS")]
    pub bind_address: Option<String>,
}

impl Config {
    /// Load configuration with precedence, low to high:
    /// built-in defaults → `config.toml` → `FINCORE_*` environment
    /// variables → CLI flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file_config = match &cli.config {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let aes_key = required_env("FINCORE_AES_KEY")?;
        let aes_key = decode_aes_key("FINCORE_AES_KEY", &aes_key)?;
        let database_url = required_env("FINCORE_DATABASE_URL")?;
        let trusted_gateway_addr = required_env("FINCORE_TRUSTED_GATEWAY_ADDR")?;

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env_var("BIND_ADDRESS"))
            .or(file_config.bind_address)
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let argon2 = Argon2Params::new(
            env_u32("ARGON2_TIME_COST")
                .or(file_config.argon2_time_cost)
                .unwrap_or(3),
            env_u32("ARGON2_MEMORY_KIB")
                .or(file_config.argon2_memory_kib)
                .unwrap_or(64 * 1024),
            env_u32("ARGON2_PARALLELISM")
                .or(file_config.argon2_parallelism)
                .unwrap_or(2),
        );

        let default_card_limits = DefaultLimits {
            daily_cents: env_i64("DEFAULT_CARD_DAILY_LIMIT_CENTS")
                .or(file_config.default_card_daily_limit_cents)
                .unwrap_or(500_000),
            monthly_cents: env_i64("DEFAULT_CARD_MONTHLY_LIMIT_CENTS")
                .or(file_config.default_card_monthly_limit_cents)
                .unwrap_or(5_000_000),
        };

        let default_user_daily_limit_cents = env_i64("DEFAULT_USER_DAILY_LIMIT_CENTS")
            .or(file_config.default_user_daily_limit_cents)
            .unwrap_or(2_000_000);
        let default_user_monthly_limit_cents = env_i64("DEFAULT_USER_MONTHLY_LIMIT_CENTS")
            .or(file_config.default_user_monthly_limit_cents)
            .unwrap_or(20_000_000);

        let db_pool_size = env_u32("DB_POOL_SIZE")
            .or(file_config.db_pool_size)
            .unwrap_or(10);

        Ok(Self {
            aes_key,
            database_url,
            trusted_gateway_addr,
            bind_address,
            argon2,
            default_card_limits,
            default_user_daily_limit_cents,
            default_user_monthly_limit_cents,
            db_pool_size,
        })
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn env_u32(suffix: &str) -> Option<u32> {
    env_var(suffix).and_then(|v| v.parse().ok())
}

fn env_i64(suffix: &str) -> Option<i64> {
    env_var(suffix).and_then(|v| v.parse().ok())
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn decode_aes_key(name: &'static str, encoded: &str) -> Result<[u8; 32], ConfigError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ConfigError::BadBase64(name, e))?;
    if bytes.len() != 32 {
        return Err(ConfigError::BadAesKeyLength(name, bytes.len()));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_spec() {
        let d = DefaultLimits::default();
        assert_eq!(d.daily_cents, 500_000);
        assert_eq!(d.monthly_cents, 5_000_000);
    }

    #[test]
    fn decode_aes_key_rejects_wrong_length() {
        use base64::Engine;
        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        let err = decode_aes_key("FINCORE_AES_KEY", &short).unwrap_err();
        assert!(matches!(err, ConfigError::BadAesKeyLength(_, 16)));
    }

    #[test]
    fn decode_aes_key_accepts_32_bytes() {
        use base64::Engine;
        let ok = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        let key = decode_aes_key("FINCORE_AES_KEY", &ok).unwrap();
        assert_eq!(key, [7u8; 32]);
    }
}
