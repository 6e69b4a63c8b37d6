//! At most one outstanding provider call per actor.
//!
//! A call that arrives while another is in flight is not queued: it gets an immediate
//! action-shaped "busy" reply instead.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::info;

use super::{ProviderClient, ProviderFuture, ProviderResponse};
use crate::agent::memory::Message;

pub const BUSY_MESSAGE: &str = "Ignoring event, I'm already busy thinking";

pub fn busy_payload() -> Value {
    json!({"code": "", "message": BUSY_MESSAGE})
}

pub struct GuardedClient {
    inner: Arc<dyn ProviderClient>,
    in_flight: Mutex<()>,
}

impl GuardedClient {
    pub fn new(inner: Arc<dyn ProviderClient>) -> Self {
        Self {
            inner,
            in_flight: Mutex::new(()),
        }
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }
}

impl ProviderClient for GuardedClient {
    fn get_chat_completion<'a>(&'a self, messages: &'a [Message]) -> ProviderFuture<'a> {
        Box::pin(async move {
            // Held until the delegate returns, success or failure.
            let Ok(_permit) = self.in_flight.try_lock() else {
                info!("provider call already in flight, skipping request");
                return Ok(ProviderResponse::new(busy_payload().to_string(), Value::Null));
            };
            self.inner.get_chat_completion(messages).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::agent::wire::parse_action;
    use crate::llm::{ProviderError, ProviderErrorCategory};

    struct Parked {
        release: Notify,
        calls: AtomicUsize,
        fail: bool,
    }

    impl ProviderClient for Parked {
        fn get_chat_completion<'a>(&'a self, _messages: &'a [Message]) -> ProviderFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.release.notified().await;
                if self.fail {
                    return Err(ProviderError::new(ProviderErrorCategory::Timeout, "30s"));
                }
                Ok(ProviderResponse::new("{\"code\":\"x\",\"message\":\"y\"}", Value::Null))
            })
        }
    }

    fn parked(fail: bool) -> Arc<Parked> {
        Arc::new(Parked {
            release: Notify::new(),
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn second_call_short_circuits_while_first_is_pending() {
        let inner = parked(false);
        let guard = Arc::new(GuardedClient::new(inner.clone()));

        let first = tokio::spawn({
            let guard = guard.clone();
            async move { guard.get_chat_completion(&[Message::user("a")]).await }
        });
        while !guard.is_busy() {
            tokio::task::yield_now().await;
        }

        let busy = guard
            .get_chat_completion(&[Message::user("b")])
            .await
            .unwrap();
        let action = parse_action(&busy.content).unwrap();
        assert_eq!(action.code, "");
        assert_eq!(action.message, BUSY_MESSAGE);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        inner.release.notify_one();
        let done = first.await.unwrap().unwrap();
        assert!(done.content.contains("\"x\""));
        assert!(!guard.is_busy());
    }

    #[tokio::test]
    async fn lock_is_released_after_failure() {
        let inner = parked(true);
        let guard = Arc::new(GuardedClient::new(inner.clone()));

        let first = tokio::spawn({
            let guard = guard.clone();
            async move { guard.get_chat_completion(&[Message::user("a")]).await }
        });
        while !guard.is_busy() {
            tokio::task::yield_now().await;
        }
        inner.release.notify_one();
        assert!(first.await.unwrap().is_err());

        inner.release.notify_one();
        let second = guard.get_chat_completion(&[Message::user("b")]).await;
        assert!(second.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
