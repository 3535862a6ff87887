//! Webhook-backed notification delivery.

use async_trait::async_trait;
use engine::{DeliveryError, Notifier};
use serde::Serialize;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> WebhookNotifier {
        WebhookNotifier {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[derive(Serialize)]
struct Message<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        self.client
            .post(&self.url)
            .json(&Message { to, subject, body })
            .send()
            .await
            .map_err(|err| DeliveryError(format!("webhook request failed: {err}")))?
            .error_for_status()
            .map_err(|err| DeliveryError(format!("webhook rejected message: {err}")))?;

        Ok(())
    }
}
