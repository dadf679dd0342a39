use std::path::PathBuf;

use tracing::warn;

/// Process settings, read from `FIELDBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub admin_username: String,
    pub admin_password: String,
    pub jwt_secret: Vec<u8>,
    pub token_ttl_days: i64,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let parse_or = |name: &str, default: u64| -> u64 {
            match lookup(name) {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("{name}={raw} is not a number, using {default}");
                    default
                }),
                None => default,
            }
        };

        let jwt_secret = match lookup("FIELDBOOK_JWT_SECRET") {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!("FIELDBOOK_JWT_SECRET not set; tokens will not survive a restart");
                let mut secret = ulid::Ulid::new().to_bytes().to_vec();
                secret.extend_from_slice(&ulid::Ulid::new().to_bytes());
                secret
            }
        };

        Self {
            port: u16::try_from(parse_or("FIELDBOOK_PORT", 5001)).unwrap_or(5001),
            bind: get("FIELDBOOK_BIND", "0.0.0.0"),
            data_dir: PathBuf::from(get("FIELDBOOK_DATA_DIR", "./data")),
            metrics_port: lookup("FIELDBOOK_METRICS_PORT").and_then(|s| s.parse().ok()),
            compact_threshold: parse_or("FIELDBOOK_COMPACT_THRESHOLD", 1000),
            admin_username: get("FIELDBOOK_ADMIN_USERNAME", "admin"),
            admin_password: get("FIELDBOOK_ADMIN_PASSWORD", "admin"),
            jwt_secret,
            token_ttl_days: i64::try_from(parse_or("FIELDBOOK_TOKEN_TTL_DAYS", 30)).unwrap_or(30),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("fieldbook.wal")
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
