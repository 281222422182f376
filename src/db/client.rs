use std::time::Instant;

use reqwest::header::{self, HeaderValue};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tap::TapFallible;
use url::Url;

use crate::{prelude::*, util::HttpHost};
use super::{ClientError, DbConfig, GraphQl, Namespace};


const AUTH_TOKEN_HEADER: &str = "X-Dgraph-AuthToken";

/// Sends requests to Dgraph's HTTP endpoints. Cheap to clone, all clones
/// share one connection pool.
#[derive(Clone)]
pub(crate) struct Client {
    http_client: reqwest::Client,
    host: HttpHost,
    auth_header: Option<HeaderValue>,
}

impl Client {
    const ALTER_PATH: &'static str = "/alter";

    /// Creates the client without contacting Dgraph.
    pub(crate) fn new(config: &DbConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("lexibase/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        let auth_header = config.auth_token.as_ref()
            .map(|token| {
                let mut value = HeaderValue::from_str(token.expose_secret())
                    .context("'db.auth_token' is not a valid HTTP header value")?;
                value.set_sensitive(true);
                Ok::<_, anyhow::Error>(value)
            })
            .transpose()?;

        Ok(Self {
            http_client,
            host: config.host.clone(),
            auth_header,
        })
    }

    pub(crate) fn host(&self) -> &HttpHost {
        &self.host
    }

    /// Builds a POST request to `url`. The auth token is only attached for
    /// administrative endpoints.
    fn post(&self, url: Url, authed: bool) -> reqwest::RequestBuilder {
        let req = self.http_client.post(url)
            .header(header::CONTENT_TYPE, "application/json");

        match (authed, &self.auth_header) {
            (true, Some(value)) => req.header(AUTH_TOKEN_HEADER, value.clone()),
            _ => req,
        }
    }

    /// Sends the request and unpacks the GraphQL response envelope. Returns
    /// the `data` member, if any.
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let before = Instant::now();
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        trace!("Received {} bytes from '{url}' in {:.2?} ({status})", body.len(), before.elapsed());

        let envelope = match serde_json::from_slice::<Envelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                trace!("Undecodable response body: {}", String::from_utf8_lossy(&body));
                return Err(e.into());
            }
            Err(_) => return Err(ClientError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        };

        let messages = envelope.errors.unwrap_or_default()
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>();
        if !messages.is_empty() {
            return Err(ClientError::GraphQl(messages));
        }

        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(envelope.data)
    }
}

impl GraphQl for Client {
    async fn alter(&self, body: &str) -> Result<(), ClientError> {
        let url = self.host.endpoint(Self::ALTER_PATH);
        trace!("Sending alter request to '{url}'");

        let req = self.post(url.clone(), true).body(body.to_owned());
        self.send(req, &url).await?;
        Ok(())
    }

    async fn query<T: DeserializeOwned>(
        &self,
        ns: Namespace,
        document: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let url = self.host.endpoint(ns.path());
        trace!("Sending GraphQL request to '{url}':\n{document}");

        let body = serde_json::to_vec(&Request { query: document, variables })?;
        let req = self.post(url.clone(), ns == Namespace::Admin).body(body);

        let data = self.send(req, &url)
            .await
            .tap_err(|e| debug!("GraphQL request to '{url}' failed: {e}"))?
            .ok_or(ClientError::MissingData)?;

        serde_json::from_value(data).map_err(Into::into)
    }
}


#[derive(Serialize)]
struct Request<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<ErrorEntry>>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    message: String,
}
