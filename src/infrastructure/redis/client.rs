use redis::{aio::MultiplexedConnection, Client};
use tracing::info;

/// Shared handle to one multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisService {
    conn: MultiplexedConnection,
}

impl RedisService {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(connection_string)?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Connected to Redis");
        Ok(Self { conn })
    }

    /// Connections multiplex over one socket; cloning is cheap.
    pub async fn get_conn(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        Ok(self.conn.clone())
    }
}
