//! Configuration Module
//!
//! Loads proxy configuration from environment variables. Parsing happens
//! once at startup and any malformed value is fatal.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

const DEFAULT_PROXY_PORT: &str = "4567";
const DEFAULT_REDIS_ADDRESS: &str = "localhost:6379";
const DEFAULT_CACHE_EXPIRY_SECONDS: &str = "500";
const DEFAULT_CACHE_CAPACITY: &str = "10";

/// Proxy configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP port the proxy listens on
    pub proxy_port: u16,
    /// Redis host name
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Time to live applied to every cached entry
    pub cache_expiry_seconds: u64,
    /// Maximum number of cached entries
    pub cache_capacity: usize,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `PROXY_PORT` - HTTP port (default: 4567)
    /// - `REDIS_ADDRESS` - Redis location as `host:port` (default: localhost:6379)
    /// - `CACHE_EXPIRY_SECONDS` - Entry TTL in seconds (default: 500)
    /// - `CACHE_CAPACITY` - Maximum cached entries (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Builds a configuration from a name/value map, applying defaults for
    /// missing names.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |name: &str, default: &'static str| {
            vars.get(name).map(String::as_str).unwrap_or(default).to_string()
        };

        let proxy_port = parse_number("PROXY_PORT", &lookup("PROXY_PORT", DEFAULT_PROXY_PORT))?;
        info!("Proxy port set to {}", proxy_port);

        let redis_address = lookup("REDIS_ADDRESS", DEFAULT_REDIS_ADDRESS);
        let (redis_host, redis_port) = match redis_address.split(':').collect::<Vec<_>>()[..] {
            [host, port] => (host.to_string(), parse_number("REDIS_ADDRESS", port)?),
            _ => return Err(ConfigError::InvalidAddress(redis_address.clone())),
        };
        info!("Redis host set to {}", redis_host);
        info!("Redis port set to {}", redis_port);

        let cache_expiry_seconds: u64 = parse_number(
            "CACHE_EXPIRY_SECONDS",
            &lookup("CACHE_EXPIRY_SECONDS", DEFAULT_CACHE_EXPIRY_SECONDS),
        )?;
        if cache_expiry_seconds == 0 {
            return Err(ConfigError::OutOfRange {
                name: "CACHE_EXPIRY_SECONDS",
            });
        }
        info!("Cache expiry set to {}", cache_expiry_seconds);

        let cache_capacity: usize = parse_number(
            "CACHE_CAPACITY",
            &lookup("CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY),
        )?;
        if cache_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: "CACHE_CAPACITY",
            });
        }
        info!("Cache capacity set to {}", cache_capacity);

        Ok(Self {
            proxy_port,
            redis_host,
            redis_port,
            cache_expiry_seconds,
            cache_capacity,
        })
    }

    /// Connection URL for the backing Redis instance.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    /// Entry time to live as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_seconds)
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.proxy_port, 4567);
        assert_eq!(config.redis_host, "localhost");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.cache_expiry_seconds, 500);
        assert_eq!(config.cache_capacity, 10);
    }

    #[test]
    fn test_config_reads_values() {
        let config = Config::from_vars(&vars(&[
            ("PROXY_PORT", "123"),
            ("REDIS_ADDRESS", "blah:123"),
            ("CACHE_EXPIRY_SECONDS", "200"),
            ("CACHE_CAPACITY", "200"),
        ]))
        .unwrap();

        assert_eq!(config.proxy_port, 123);
        assert_eq!(config.redis_host, "blah");
        assert_eq!(config.redis_port, 123);
        assert_eq!(config.cache_expiry_seconds, 200);
        assert_eq!(config.cache_capacity, 200);
        assert_eq!(config.ttl(), Duration::from_secs(200));
        assert_eq!(config.redis_url(), "redis://blah:123/");
    }

    #[test]
    fn test_config_rejects_non_numeric_proxy_port() {
        let result = Config::from_vars(&vars(&[("PROXY_PORT", "asf123")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { name: "PROXY_PORT", .. })
        ));
    }

    #[test]
    fn test_config_rejects_address_without_colon() {
        let result = Config::from_vars(&vars(&[("REDIS_ADDRESS", "blaha123")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidAddress("blaha123".to_string()))
        );
    }

    #[test]
    fn test_config_rejects_address_with_extra_colon() {
        let result = Config::from_vars(&vars(&[("REDIS_ADDRESS", "a:b:1")]));
        assert!(matches!(result, Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn test_config_rejects_non_numeric_redis_port() {
        let result = Config::from_vars(&vars(&[("REDIS_ADDRESS", "blah:a123")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { name: "REDIS_ADDRESS", .. })
        ));
    }

    #[test]
    fn test_config_rejects_non_numeric_expiry() {
        let result = Config::from_vars(&vars(&[("CACHE_EXPIRY_SECONDS", "a200")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { name: "CACHE_EXPIRY_SECONDS", .. })
        ));
    }

    #[test]
    fn test_config_rejects_empty_capacity() {
        let result = Config::from_vars(&vars(&[("CACHE_CAPACITY", "")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { name: "CACHE_CAPACITY", .. })
        ));
    }

    #[test]
    fn test_config_rejects_zero_capacity_and_expiry() {
        assert_eq!(
            Config::from_vars(&vars(&[("CACHE_CAPACITY", "0")])),
            Err(ConfigError::OutOfRange { name: "CACHE_CAPACITY" })
        );
        assert_eq!(
            Config::from_vars(&vars(&[("CACHE_EXPIRY_SECONDS", "0")])),
            Err(ConfigError::OutOfRange { name: "CACHE_EXPIRY_SECONDS" })
        );
    }
}
