//! HTTP-backed currency rate source.

use async_trait::async_trait;
use engine::{Currency, RateError, RateSource};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

pub struct ExchangeRateApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ExchangeRateApi {
    pub fn new(api_key: String, base_url: Option<String>) -> ExchangeRateApi {
        ExchangeRateApi {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct PairResponse {
    conversion_rate: f64,
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64, RateError> {
        let url = format!(
            "{}/{}/pair/{}/{}",
            self.base_url,
            self.api_key,
            from.code(),
            to.code()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RateError(format!("rate request failed: {err}")))?
            .error_for_status()
            .map_err(|err| RateError(format!("rate request failed: {err}")))?;

        let pair: PairResponse = response
            .json()
            .await
            .map_err(|err| RateError(format!("malformed rate response: {err}")))?;

        Ok(pair.conversion_rate)
    }
}
