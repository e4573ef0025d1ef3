// secrets
use std::collections::HashMap;
use std::env;
use tracing::{info, warn};

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DATABASE_NAME: &str = "DATABASE_NAME";
pub const PORT: &str = "PORT";

const DEFAULT_PORT: u16 = 8000;
const KEYS: [&str; 3] = [DATABASE_URL, DATABASE_NAME, PORT];

/// Environment-derived settings, collected once at startup.
///
/// Empty variables count as unset.
#[derive(Debug, Clone, Default)]
pub struct SecretManager {
    secrets: HashMap<String, String>,
}

impl SecretManager {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets: HashMap<String, String> = KEYS
            .iter()
            .filter_map(|key| {
                lookup(key)
                    .filter(|value| !value.is_empty())
                    .map(|value| (key.to_string(), value))
            })
            .collect();

        // Log which secrets are configured (NOT their values!)
        let mut configured: Vec<&str> = secrets.keys().map(String::as_str).collect();
        configured.sort_unstable();
        info!("Secrets configured: {:?}", configured);

        SecretManager { secrets }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }

    pub fn port(&self) -> u16 {
        match self.get(PORT) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("PORT={} is not a valid port, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        }
    }
}
