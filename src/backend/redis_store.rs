//! Redis Backing Store
//!
//! Reads values with `GET` over a [`ConnectionManager`], which multiplexes a
//! single connection across callers and reconnects after failures.

use ::redis::{aio::ConnectionManager, AsyncCommands, Client};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::BackingStore;
use crate::error::BackendError;

// == Redis Backend ==
/// Redis client used to load cache misses.
///
/// The connection is opened on the first fetch rather than at construction,
/// so the proxy can start while Redis is still coming up.
pub struct RedisBackend {
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisBackend {
    /// Creates a backend for the given `redis://` URL without connecting.
    pub fn new(url: &str) -> Result<Self, BackendError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, BackendError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                info!("Connecting to Redis");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl BackingStore for RedisBackend {
    async fn fetch(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.connection().await.map_err(|err| {
            warn!(error = %err, "Redis connection failed");
            err
        })?;

        let value: Option<String> = conn.get(key).await.map_err(|err| {
            warn!(key, error = %err, "Redis GET failed");
            BackendError::from(err)
        })?;

        Ok(value)
    }
}
