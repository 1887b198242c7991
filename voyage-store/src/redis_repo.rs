use redis::RedisResult;
use tracing::debug;

/// Fixed-window request counters shared by every API instance.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Counts one hit against `key` and reports whether it is still within `limit`.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        if count > limit {
            debug!(key, count, limit, "rate limit exceeded");
        }
        Ok(count <= limit)
    }
}

pub fn rate_limit_key(scope: &str, client: &str) -> String {
    format!("ratelimit:{}:{}", scope, client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_layout() {
        assert_eq!(rate_limit_key("login", "10.0.0.1"), "ratelimit:login:10.0.0.1");
    }

    #[tokio::test]
    async fn test_client_accepts_redis_url() {
        // Opening does not connect, so no server is needed
        assert!(RedisClient::new("redis://127.0.0.1:6379").await.is_ok());
    }
}
