//! Interruption queue capability.
//!
//! Karpenter consumes spot interruption, rebalance and health events from an
//! SQS queue. Suites that exercise interruption handling send events to the
//! same queue and watch the controller react. The capability is active only
//! when `INTERRUPTION_QUEUE` names a queue; otherwise interruption testing is
//! not available for the run.

use crate::capability::Capability;
use crate::config::ConfigHandle;
use crate::error::EnvironmentError;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use thiserror::Error;

/// Maximum messages returned by one receive call.
pub const MAX_RECEIVE_MESSAGES: i32 = 10;

/// Seconds a received message stays invisible to other consumers.
pub const VISIBILITY_TIMEOUT_SECONDS: i32 = 20;

/// Long-poll wait time for receive calls.
pub const WAIT_TIME_SECONDS: i32 = 20;

/// Interruption queue errors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue '{0}' does not exist")]
    NotFound(String),

    #[error("SQS request failed: {0}")]
    RequestFailed(String),
}

/// Resolves queue names to queue URLs (enables mocking).
#[async_trait::async_trait]
pub trait QueueResolver: Send + Sync {
    /// Look up the URL of the queue called `name`.
    async fn queue_url(&self, name: &str) -> Result<String, QueueError>;
}

#[async_trait::async_trait]
impl QueueResolver for aws_sdk_sqs::Client {
    async fn queue_url(&self, name: &str) -> Result<String, QueueError> {
        let output = self
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_queue_does_not_exist())
                {
                    QueueError::NotFound(name.to_string())
                } else {
                    QueueError::RequestFailed(DisplayErrorContext(&e).to_string())
                }
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| QueueError::NotFound(name.to_string()))
    }
}

/// A queue name resolved to its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAddress {
    pub name: String,
    pub url: String,
}

/// Resolve the interruption queue, if one was requested.
///
/// Returns `Ok(None)` without calling the resolver when no queue name is set.
/// A name that does not resolve is fatal: an explicitly requested queue that
/// cannot be found means the run is misconfigured.
pub async fn resolve_interruption_queue(
    queue_name: Option<&str>,
    resolver: &dyn QueueResolver,
) -> Result<Option<QueueAddress>, EnvironmentError> {
    let Some(name) = queue_name else {
        tracing::debug!(
            target: "aws_env.interruption",
            "No interruption queue configured, interruption testing disabled"
        );
        return Ok(None);
    };

    let url = resolver
        .queue_url(name)
        .await
        .map_err(|source| EnvironmentError::QueueLookup {
            queue: name.to_string(),
            source,
        })?;

    tracing::info!(
        target: "aws_env.interruption",
        queue = %name,
        queue_url = %url,
        "Interruption queue resolved"
    );

    Ok(Some(QueueAddress {
        name: name.to_string(),
        url,
    }))
}

/// Activate the interruption queue capability.
///
/// `resolver` is only consulted when a queue is requested. The provider it
/// yields talks to SQS through a client built from `config`.
pub async fn activate_interruption_queue(
    queue_name: Option<&str>,
    config: &ConfigHandle,
    resolver: &dyn QueueResolver,
) -> Result<Capability<InterruptionQueueProvider>, EnvironmentError> {
    let Some(address) = resolve_interruption_queue(queue_name, resolver).await? else {
        return Ok(Capability::Disabled);
    };

    let client = aws_sdk_sqs::Client::new(config.sdk_config());
    Ok(Capability::Enabled(InterruptionQueueProvider::new(
        client, address,
    )))
}

/// A message received from the interruption queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
}

/// Thin provider bound to the interruption queue URL.
///
/// Parsing interruption events is the controller's concern; this provider
/// only moves raw message bodies.
#[derive(Debug, Clone)]
pub struct InterruptionQueueProvider {
    client: aws_sdk_sqs::Client,
    address: QueueAddress,
}

impl InterruptionQueueProvider {
    /// Bind a provider to a resolved queue.
    pub fn new(client: aws_sdk_sqs::Client, address: QueueAddress) -> Self {
        Self { client, address }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.address.name
    }

    /// Queue URL.
    pub fn url(&self) -> &str {
        &self.address.url
    }

    /// Send a raw event body; returns the SQS message ID.
    pub async fn send_message(&self, body: &str) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(self.url())
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::RequestFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }

    /// Long-poll the queue for up to [`MAX_RECEIVE_MESSAGES`] messages.
    pub async fn receive_messages(&self) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(self.url())
            .max_number_of_messages(MAX_RECEIVE_MESSAGES)
            .visibility_timeout(VISIBILITY_TIMEOUT_SECONDS)
            .wait_time_seconds(WAIT_TIME_SECONDS)
            .message_system_attribute_names(MessageSystemAttributeName::SentTimestamp)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| QueueError::RequestFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .messages()
            .iter()
            .map(|m| QueueMessage {
                message_id: m.message_id().unwrap_or_default().to_string(),
                receipt_handle: m.receipt_handle().unwrap_or_default().to_string(),
                body: m.body().unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Delete a processed message.
    pub async fn delete_message(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(self.url())
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::RequestFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

/// Mock queue resolvers for testing.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock resolver backed by a name-to-URL map.
    #[derive(Debug, Default)]
    pub struct MockQueueResolver {
        queues: HashMap<String, String>,
        call_count: AtomicUsize,
    }

    impl MockQueueResolver {
        /// Create a resolver that knows no queues.
        pub fn empty() -> Self {
            Self::default()
        }

        /// Create a resolver that knows one queue.
        pub fn with_queue(name: &str, url: &str) -> Self {
            Self {
                queues: HashMap::from([(name.to_string(), url.to_string())]),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of lookups made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl QueueResolver for MockQueueResolver {
        async fn queue_url(&self, name: &str) -> Result<String, QueueError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            self.queues
                .get(name)
                .cloned()
                .ok_or_else(|| QueueError::NotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::config::mock::offline_handle;

    const QUEUE_URL: &str = "https://sqs.us-west-2.amazonaws.com/123456789012/test-cluster";

    #[tokio::test]
    async fn test_absent_queue_skips_lookup() {
        let resolver = MockQueueResolver::with_queue("test-cluster", QUEUE_URL);

        let resolved = resolve_interruption_queue(None, &resolver)
            .await
            .expect("absent queue is not an error");

        assert_eq!(resolved, None);
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_present_queue_resolves_url() {
        let resolver = MockQueueResolver::with_queue("test-cluster", QUEUE_URL);

        let resolved = resolve_interruption_queue(Some("test-cluster"), &resolver)
            .await
            .expect("queue should resolve");

        assert_eq!(
            resolved,
            Some(QueueAddress {
                name: "test-cluster".to_string(),
                url: QUEUE_URL.to_string(),
            })
        );
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_queue_is_fatal() {
        let resolver = MockQueueResolver::empty();

        let result = resolve_interruption_queue(Some("missing-queue"), &resolver).await;

        assert!(matches!(
            result,
            Err(EnvironmentError::QueueLookup { queue, source: QueueError::NotFound(_) })
                if queue == "missing-queue"
        ));
    }

    #[tokio::test]
    async fn test_activate_without_queue_is_disabled() {
        let handle = offline_handle("us-west-2").expect("handle should build");
        let resolver = MockQueueResolver::with_queue("test-cluster", QUEUE_URL);

        let capability = activate_interruption_queue(None, &handle, &resolver)
            .await
            .expect("absent queue is not an error");

        assert!(!capability.is_enabled());
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_activate_with_queue_binds_provider() {
        let handle = offline_handle("us-west-2").expect("handle should build");
        let resolver = MockQueueResolver::with_queue("test-cluster", QUEUE_URL);

        let capability = activate_interruption_queue(Some("test-cluster"), &handle, &resolver)
            .await
            .expect("queue should resolve");

        let provider = capability.enabled().expect("capability should be enabled");
        assert_eq!(provider.name(), "test-cluster");
        assert_eq!(provider.url(), QUEUE_URL);
    }

    #[tokio::test]
    async fn test_empty_queue_name_is_looked_up_and_fails() {
        let handle = offline_handle("us-west-2").expect("handle should build");
        let resolver = MockQueueResolver::with_queue("test-cluster", QUEUE_URL);

        let result = activate_interruption_queue(Some(""), &handle, &resolver).await;

        assert!(matches!(
            result,
            Err(EnvironmentError::QueueLookup { ref queue, .. }) if queue.is_empty()
        ));
        assert_eq!(resolver.call_count(), 1);
    }

    #[test]
    fn test_provider_exposes_address() {
        let handle = offline_handle("us-west-2").expect("handle should build");
        let provider = InterruptionQueueProvider::new(
            aws_sdk_sqs::Client::new(handle.sdk_config()),
            QueueAddress {
                name: "test-cluster".to_string(),
                url: QUEUE_URL.to_string(),
            },
        );

        assert_eq!(provider.name(), "test-cluster");
        assert_eq!(provider.url(), QUEUE_URL);
    }
}
