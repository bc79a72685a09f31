use async_trait::async_trait;
use coachline_core::repository::JobLock;
use coachline_core::{CoreError, CoreResult};
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn lock_key(job: &str) -> String {
        format!("job-lock:{}", job)
    }
}

#[async_trait]
impl JobLock for RedisClient {
    async fn try_acquire(&self, job: &str, holder: &str, ttl_seconds: u64) -> CoreResult<bool> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::storage)?;

        // SET NX: only one holder across the deployment
        let result: Option<String> = redis::cmd("SET")
            .arg(Self::lock_key(job))
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await
            .map_err(CoreError::storage)?;

        if result.is_some() {
            info!("Job lock {} acquired by {}", job, holder);
        }
        Ok(result.is_some())
    }

    async fn release(&self, job: &str, holder: &str) -> CoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::storage)?;

        // Delete only if we still own it; an expired lock may belong to someone else now
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let _: i64 = script
            .key(Self::lock_key(job))
            .arg(holder)
            .invoke_async(&mut conn)
            .await
            .map_err(CoreError::storage)?;
        Ok(())
    }
}
