//! Outbound collaborator ports.
//!
//! The engine talks to two external services: a currency-rate provider used
//! to normalise amounts before admission, and a notification sender for
//! overspend/pending/failed/reminder messages. Both are consumed as trait
//! objects so the app crate can plug in HTTP-backed implementations and the
//! tests can record what would have been sent.

use async_trait::async_trait;
use thiserror::Error;

use crate::Currency;

/// Rate lookup failure. Surfaces to callers as
/// [`EngineError::ConversionUnavailable`](crate::EngineError::ConversionUnavailable).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RateError(pub String);

/// Currency conversion collaborator.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `to` per one unit of `from`.
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64, RateError>;
}

/// Notification delivery failure. Always swallowed by the engine: delivery
/// is best effort and never fails the caller's primary operation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

/// Notification sender collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Default rate source: refuses every lookup. Deployments that accept
/// foreign-currency input must configure a real provider.
pub struct NoRates;

#[async_trait]
impl RateSource for NoRates {
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64, RateError> {
        Err(RateError(format!("no rate provider configured ({from} -> {to})")))
    }
}

/// Default notifier: logs the message instead of delivering it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), DeliveryError> {
        tracing::info!("notification for {to}: {subject}");
        Ok(())
    }
}
