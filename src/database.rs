//! # Redis
//!
//! RAM database.
//!
//! Core purpose is to hold the session registry: which opaque token stands in for which
//! (app key, poll id) pair, and the reverse lookup used to keep registration idempotent.
//!
//! ## Requirements
//!
//! - Fast lookups on every proxied request
//! - Tiny dataset, two short strings per registered poll
//! - Conditional writes so two racing first registrations agree on one token
//!
//! ## Implementation
//!
//! - Plain string keys, no hashes, no TTL
//! - `token -> "appKey-pollId"` and `"appKey-pollId" -> token`
//! - `SET NX` for the reverse entry, see [`crate::registry`]
//! - Connection manager reconnects on its own, one retry per command
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::warn;

use crate::{error::AppError, store::KeyValueStore};

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut connection = self.connection.clone();

        Ok(connection.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut connection = self.connection.clone();

        connection.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();

        Ok(connection.exists::<_, bool>(key).await?)
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();

        Ok(connection.set_nx::<_, _, bool>(key, value).await?)
    }

    async fn ping(&self) -> bool {
        let mut connection = self.connection.clone();

        match redis::cmd("PING").query_async::<String>(&mut connection).await {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                warn!("Redis ping failed: {e}");
                false
            }
        }
    }
}
