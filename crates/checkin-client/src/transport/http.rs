//! reqwest-backed ledger transport.

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use std::time::Duration;

use super::traits::*;
use crate::error::{LedgerError, Result};

/// HTTP transport over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport. `timeout_secs` of `None` keeps reqwest's default.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<TransportReply> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportReply::Readable { status, body })
    }
}

#[async_trait]
impl LedgerTransport for HttpTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TransportReply> {
        let mut url = Url::parse(url)
            .map_err(|e| LedgerError::Transport(format!("invalid endpoint URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
        visibility: ResponseVisibility,
    ) -> Result<TransportReply> {
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        match visibility {
            ResponseVisibility::Readable => Self::read(response).await,
            ResponseVisibility::Opaque => Ok(TransportReply::Opaque),
        }
    }
}
