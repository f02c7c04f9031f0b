//! Job Intake (§4.1 step 1): consumes task records off the transport,
//! estimates resources, and inserts them into the admission engine's
//! pending set. Runs as its own loop, independent of the dispatch tick.

use crate::cache::transport::{Delivery, StreamTransport};
use crate::jobs::estimator::Estimator;
use crate::jobs::priority::PriorityEngine;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct IntakeLoop {
    transport: Arc<StreamTransport>,
    estimator: Arc<Estimator>,
    engine: Arc<PriorityEngine>,
    consumer: String,
}

impl IntakeLoop {
    pub fn new(
        transport: Arc<StreamTransport>,
        estimator: Arc<Estimator>,
        engine: Arc<PriorityEngine>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            estimator,
            engine,
            consumer: consumer.into(),
        }
    }

    /// Poll the transport once and admit every well-formed delivery. Returns
    /// the number of tasks inserted into the pending set.
    pub async fn poll_once(&self) -> crate::Result<usize> {
        let deliveries = self.transport.poll(&self.consumer).await?;
        let mut admitted = 0;

        for delivery in deliveries {
            if self.admit(&delivery).await {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Process a single delivery. Acks on success and on a malformed message
    /// (including a payload that failed to parse at all, §4.1's "malformed
    /// messages are acknowledged and logged"); leaves the delivery unacked
    /// (for redelivery) on any failure prior to insertion into the pending
    /// set.
    async fn admit(&self, delivery: &Delivery) -> bool {
        let Some(message) = &delivery.message else {
            warn!(entry_id = %delivery.entry_id, stream = %delivery.stream, "intake: malformed payload, acking and dropping");
            let _ = self.transport.ack(delivery).await;
            return false;
        };

        let job_id = message.job_id.clone();

        if message.urls.is_empty() {
            warn!(job_id, "intake: empty url list, acking and dropping");
            let _ = self.transport.ack(delivery).await;
            return false;
        }

        let estimate = match self.estimator.estimate(message.urls.len() as i32, message.user_id.as_deref()).await {
            Ok(estimate) => estimate,
            Err(e) => {
                error!(job_id, error = %e, "intake: estimate failed, leaving unacked for redelivery");
                return false;
            }
        };

        self.engine.insert(job_id.clone(), message.user_id.clone(), message.urls.clone(), estimate);

        if let Err(e) = self.transport.ack(delivery).await {
            error!(job_id, error = %e, "intake: ack failed after admission");
            return true;
        }

        debug!(job_id, "intake: admitted");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::transport::TransportMessage;

    fn delivery(job_id: &str, urls: Vec<String>) -> Delivery {
        Delivery {
            message: Some(TransportMessage {
                job_id: job_id.to_string(),
                urls,
                user_id: None,
            }),
            stream: "crawlctl.jobs:0".to_string(),
            entry_id: "1-0".to_string(),
        }
    }

    #[test]
    fn test_empty_url_delivery_is_detected() {
        let d = delivery("x", vec![]);
        assert!(d.message.unwrap().urls.is_empty());
    }

    #[test]
    fn test_malformed_delivery_carries_no_message() {
        let d = Delivery { message: None, stream: "crawlctl.jobs:0".to_string(), entry_id: "2-0".to_string() };
        assert!(d.message.is_none());
    }
}
