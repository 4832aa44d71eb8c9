//! HTTP delivery of formatted payloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use herald_common::types::Destination;
use herald_formatter::Payload;

use crate::error::{DeliveryError, MAX_ERROR_LEN, truncate};

/// Sends one payload to one destination.
///
/// Returns the response status on 2xx; every other outcome is a [`DeliveryError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        destination: &Destination,
        payload: &Payload,
    ) -> Result<u16, DeliveryError>;
}

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeouts {
    /// Separate connect and read limits
    Split { connect: Duration, read: Duration },
    /// One limit for the whole request
    Total(Duration),
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts::Split {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(20),
        }
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// Keeps one client that verifies certificates and one that does not, chosen
/// per destination.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    insecure_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Self::builder(timeouts).build()?,
            insecure_client: Self::builder(timeouts)
                .danger_accept_invalid_certs(true)
                .build()?,
        })
    }

    fn builder(timeouts: Timeouts) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder()
            .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")));
        match timeouts {
            Timeouts::Split { connect, read } => {
                builder.connect_timeout(connect).read_timeout(read)
            }
            Timeouts::Total(total) => builder.timeout(total),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        destination: &Destination,
        payload: &Payload,
    ) -> Result<u16, DeliveryError> {
        let client = if destination.verify_tls {
            &self.client
        } else {
            &self.insecure_client
        };

        let request = client
            .post(destination.webhook_url.clone())
            .headers(header_map(destination)?);

        let request = match payload {
            Payload::Json(body) => request.json(body),
            Payload::Raw(text) => request.body(text.clone().into_bytes()),
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            code: status.as_u16(),
            body: truncate(body.trim(), MAX_ERROR_LEN),
        })
    }
}

fn header_map(destination: &Destination) -> Result<HeaderMap, DeliveryError> {
    let mut headers = HeaderMap::with_capacity(destination.headers.len());
    for (name, value) in &destination.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            DeliveryError::InvalidRequest(format!("invalid header name '{}'", name))
        })?;
        // Values are not echoed back; they commonly hold credentials.
        let value = HeaderValue::from_str(value).map_err(|_| {
            DeliveryError::InvalidRequest(format!("invalid value for header '{}'", name))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
