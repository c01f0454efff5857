use anyhow::Context;
use redis::aio::ConnectionManager;

/// Builds the connection URL from a `host:port` address or a full `redis://` URL and a logical database.
pub fn redis_url(address: &str, database: u16) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        format!("{}/{}", address, database)
    } else {
        format!("redis://{}/{}", address, database)
    }
}

/// Connects to Redis with a managed connection that reconnects automatically and can be shared by all requests.
pub async fn connect_redis(address: &str, database: u16) -> anyhow::Result<ConnectionManager> {
    let url = redis_url(address, database);
    tracing::info!(%address, %database, "connecting to redis");

    let client = match redis::Client::open(url.as_str()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(reason = ?e, %address, "failed to parse redis address");
            return Err(e).context("failed to parse redis address");
        }
    };

    match ConnectionManager::new(client).await {
        Ok(conn) => {
            tracing::info!(%address, %database, "connected to redis");
            Ok(conn)
        }
        Err(e) => {
            tracing::error!(reason = ?e, %address, "failed to connect to redis");
            Err(e).context("failed to connect to redis")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_accepts_address_or_url() {
        assert_eq!(redis_url("localhost:6379", 0), "redis://localhost:6379/0");
        assert_eq!(redis_url("redis://cache:6379", 3), "redis://cache:6379/3");
        assert_eq!(redis_url("redis://cache:6379/", 3), "redis://cache:6379/3");
    }
}
