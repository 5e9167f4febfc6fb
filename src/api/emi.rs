//! [EMI](https://www.emi.ea.govt.nz) real-time dispatch client.

use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use thiserror::Error;

use crate::{
    core::{
        record::{RawPriceItem, TransformError},
        snapshot::PriceSnapshot,
    },
    poll::PriceSource,
    prelude::*,
};

pub const DEFAULT_ENDPOINT: &str = "https://emi.azure-api.net/real-time-dispatch/";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to call the price API: {0}")]
    Network(#[from] reqwest::Error),

    #[error("the price API responded with `{status}`: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("failed to decode the price API response: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

pub struct Api {
    client: reqwest::Client,
    endpoint: Url,
}

impl Api {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Fetch the latest dispatch prices of the grid exit point.
    #[instrument(skip_all, fields(gxp = gxp))]
    pub async fn fetch(&self, api_key: &str, gxp: &str) -> Result<PriceSnapshot, FetchError> {
        info!("fetching…");
        let response = self
            .client
            .get(filter_url(&self.endpoint, gxp))
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(FetchError::HttpStatus { status, body });
        }
        let body = response.bytes().await?;
        let items: Vec<RawPriceItem> = serde_json::from_slice(&body).map_err(DecodeError::from)?;
        let snapshot = PriceSnapshot::try_from_items(items).map_err(DecodeError::from)?;
        info!(n_points = snapshot.len(), "fetched");
        Ok(snapshot)
    }
}

/// Restrict the results to the single connection point, server-side.
fn filter_url(endpoint: &Url, gxp: &str) -> Url {
    let mut url = endpoint.clone();
    url.set_query(Some(&format!("$filter=PointOfConnectionCode eq '{gxp}'")));
    url
}

/// Price source bound to the credential and the grid exit point.
#[derive(Builder)]
pub struct GxpPrices {
    api: Api,

    #[builder(into)]
    api_key: String,

    #[builder(into)]
    gxp: String,
}

#[async_trait]
impl PriceSource for GxpPrices {
    async fn fetch_snapshot(&self) -> Result<PriceSnapshot, FetchError> {
        self.api.fetch(&self.api_key, &self.gxp).await
    }
}
