//! The external *crawl* collaborator boundary (§1 Non-goals: URL fetching
//! and HTML sanitisation live outside the core). [`CrawlExecutor`] is the
//! seam the dispatch loop invokes; production wiring supplies an
//! implementation that actually fetches and sanitises pages.

use async_trait::async_trait;

/// Progress callback invoked by the crawl collaborator as URLs complete,
/// threaded through so the dispatch loop can mirror updates into the Live
/// Status Cache.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, message: &str, urls_succeeded: i32, urls_failed: i32);
}

/// Outcome of a completed crawl run
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub urls_succeeded: i32,
    pub urls_failed: i32,
    pub result_html: String,
}

/// External collaborator that fetches and sanitises the given URLs.
/// Per-URL failures are not errors — they're folded into `urls_failed`;
/// only a total crash of the driver should return `Err`, which the dispatch
/// loop maps to a terminal FAILED job (§4.1 failure semantics).
#[async_trait]
pub trait CrawlExecutor: Send + Sync {
    async fn crawl(
        &self,
        job_id: &str,
        urls: &[String],
        reporter: &dyn ProgressReporter,
    ) -> crate::Result<CrawlOutcome>;
}

/// Default production [`CrawlExecutor`]: fetches each URL with a plain GET
/// and concatenates the successful bodies into `result_html`. Sanitisation
/// and rendering are left to whatever collaborator replaces this one; this
/// exists so the control plane runs standalone without a separate crawler
/// fleet.
pub struct DefaultHttpExecutor {
    client: reqwest::Client,
}

impl DefaultHttpExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for DefaultHttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrawlExecutor for DefaultHttpExecutor {
    async fn crawl(
        &self,
        _job_id: &str,
        urls: &[String],
        reporter: &dyn ProgressReporter,
    ) -> crate::Result<CrawlOutcome> {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut bodies = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        succeeded += 1;
                        bodies.push(format!("<section data-url=\"{url}\">{body}</section>"));
                    }
                    Err(_) => failed += 1,
                },
                _ => failed += 1,
            }

            reporter
                .report(&format!("Crawling {}/{}", i + 1, urls.len()), succeeded, failed)
                .await;
        }

        Ok(CrawlOutcome {
            urls_succeeded: succeeded,
            urls_failed: failed,
            result_html: format!("<html><body>{}</body></html>", bodies.join("\n")),
        })
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stub used by dispatch-loop tests: succeeds on every URL
    /// and reports progress once per URL.
    pub struct StubCrawlExecutor {
        pub fail_all: bool,
    }

    #[async_trait]
    impl CrawlExecutor for StubCrawlExecutor {
        async fn crawl(
            &self,
            job_id: &str,
            urls: &[String],
            reporter: &dyn ProgressReporter,
        ) -> crate::Result<CrawlOutcome> {
            if self.fail_all {
                return Err(crate::Error::internal("stub crawl failure"));
            }

            let succeeded = AtomicUsize::new(0);
            for (i, _url) in urls.iter().enumerate() {
                succeeded.store(i + 1, Ordering::SeqCst);
                reporter
                    .report(
                        &format!("Crawling {}/{}", i + 1, urls.len()),
                        (i + 1) as i32,
                        0,
                    )
                    .await;
            }

            Ok(CrawlOutcome {
                urls_succeeded: urls.len() as i32,
                urls_failed: 0,
                result_html: format!("<html><body>job {job_id} complete</body></html>"),
            })
        }
    }
}
