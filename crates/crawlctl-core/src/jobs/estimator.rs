//! Resource estimation (§4.2): turns a raw URL count into a
//! [`ResourceEstimate`] using historical duration-per-URL averages and a
//! stepwise thread function.

use crate::jobs::job::ResourceEstimate;
use sqlx::PgPool;

const MIN_DURATION_PER_URL_MS: i64 = 100;
const MAX_DURATION_PER_URL_MS: i64 = 30_000;
const DEFAULT_DURATION_PER_URL_MS: i64 = 2000;
const SAMPLE_SIZE: i64 = 100;
const DURATION_NORMALIZATION_MS: f64 = 30_000.0;

pub struct Estimator {
    pool: PgPool,
}

impl Estimator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Compute a [`ResourceEstimate`] for a pending submission of `url_count`
    /// URLs, optionally scoped to a single user's history.
    pub async fn estimate(&self, url_count: i32, user_id: Option<&str>) -> crate::Result<ResourceEstimate> {
        let duration_per_url_ms = self.duration_per_url_ms(user_id).await?;

        let estimated_duration_ms = duration_per_url_ms * url_count as i64;
        let estimated_threads = threads_for_url_count(url_count);
        let resource_score = resource_score(estimated_threads, estimated_duration_ms);

        Ok(ResourceEstimate {
            estimated_threads,
            estimated_duration_ms,
            resource_score,
        })
    }

    /// Mean of `executionDurationMs / urlsSubmitted` over the most recent
    /// `SAMPLE_SIZE` SUCCEEDED jobs, clamped to `[100, 30000]`.
    async fn duration_per_url_ms(&self, user_id: Option<&str>) -> crate::Result<i64> {
        let rows: Vec<(i64, i32)> = if let Some(user_id) = user_id {
            sqlx::query_as(
                "SELECT execution_time_ms, urls_submitted FROM job \
                 WHERE status = 'SUCCEEDED' AND execution_time_ms IS NOT NULL AND user_id = $1 \
                 ORDER BY completed_at DESC LIMIT $2",
            )
            .bind(user_id)
            .bind(SAMPLE_SIZE)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT execution_time_ms, urls_submitted FROM job \
                 WHERE status = 'SUCCEEDED' AND execution_time_ms IS NOT NULL \
                 ORDER BY completed_at DESC LIMIT $1",
            )
            .bind(SAMPLE_SIZE)
            .fetch_all(&self.pool)
            .await?
        };

        if rows.is_empty() {
            return Ok(DEFAULT_DURATION_PER_URL_MS);
        }

        let samples: Vec<f64> = rows
            .iter()
            .filter(|(_, urls)| *urls > 0)
            .map(|(duration, urls)| *duration as f64 / *urls as f64)
            .collect();

        if samples.is_empty() {
            return Ok(DEFAULT_DURATION_PER_URL_MS);
        }

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        Ok((mean as i64).clamp(MIN_DURATION_PER_URL_MS, MAX_DURATION_PER_URL_MS))
    }
}

/// Stepwise thread function (§4.2)
pub fn threads_for_url_count(url_count: i32) -> i32 {
    match url_count {
        n if n <= 5 => 1,
        n if n <= 20 => (n / 7 + 1).min(3),
        n if n <= 50 => (n / 10 + 2).min(6),
        n => (n / 10 + 3).min(10),
    }
}

/// `resourceScore = 0.6 * (threads/10) + 0.4 * min(1, duration/30000)`
pub fn resource_score(threads: i32, duration_ms: i64) -> f64 {
    let thread_component = 0.6 * (threads as f64 / 10.0);
    let duration_component = 0.4 * (duration_ms as f64 / DURATION_NORMALIZATION_MS).min(1.0);
    thread_component + duration_component
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_stepwise_small() {
        assert_eq!(threads_for_url_count(1), 1);
        assert_eq!(threads_for_url_count(5), 1);
    }

    #[test]
    fn test_thread_stepwise_medium() {
        assert_eq!(threads_for_url_count(6), 1);
        assert_eq!(threads_for_url_count(20), 3);
    }

    #[test]
    fn test_thread_stepwise_large() {
        assert_eq!(threads_for_url_count(21), 4);
        assert_eq!(threads_for_url_count(50), 6);
    }

    #[test]
    fn test_thread_stepwise_xl_clamped_at_ten() {
        assert_eq!(threads_for_url_count(51), 8);
        assert_eq!(threads_for_url_count(1000), 10);
    }

    #[test]
    fn test_resource_score_bounds() {
        let score = resource_score(10, 30_000);
        assert!((score - 1.0).abs() < f64::EPSILON);

        let score = resource_score(1, 100);
        assert!(score > 0.0 && score < 0.2);
    }

    #[test]
    fn test_resource_score_clamps_duration_component() {
        let score_at_cap = resource_score(1, 30_000);
        let score_over_cap = resource_score(1, 60_000);
        assert_eq!(score_at_cap, score_over_cap);
    }
}
