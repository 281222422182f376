//! Everything needed to talk to the Dgraph database via its GraphQL and
//! admin HTTP endpoints.

use std::{future::Future, time::Duration};

use secrecy::SecretString;
use serde::de::DeserializeOwned;

use crate::util::HttpHost;


mod client;
#[cfg(test)]
pub(crate) mod tests;

pub(crate) use self::client::Client;


/// Substring of the error message Dgraph answers with while it is still
/// starting up and cannot serve schema operations yet.
pub(crate) const NOT_READY_MARKER: &str = "Server not ready";


#[derive(Debug, confique::Config)]
pub(crate) struct DbConfig {
    /// The host Dgraph (Alpha) is listening on for HTTP requests. The
    /// endpoints `/graphql`, `/admin` and `/alter` are derived from this.
    /// Plain HTTP is only allowed for loopback addresses, unless you
    /// explicitly append `#allow-insecure`.
    #[config(default = "http://127.0.0.1:8080")]
    pub(crate) host: HttpHost,

    /// Token sent as `X-Dgraph-AuthToken` header with all admin and alter
    /// requests. Only required if Dgraph was started with an admin token.
    pub(crate) auth_token: Option<SecretString>,

    /// Timeout for a single HTTP request to Dgraph.
    #[config(default = "30s", deserialize_with = crate::config::deserialize_duration)]
    pub(crate) request_timeout: Duration,
}

/// The GraphQL endpoint a document is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Namespace {
    /// `/graphql`: queries and mutations against the data, typed by the
    /// installed schema.
    Graphql,

    /// `/admin`: administrative operations, e.g. schema management.
    Admin,
}

impl Namespace {
    pub(crate) fn path(self) -> &'static str {
        match self {
            Namespace::Graphql => "/graphql",
            Namespace::Admin => "/admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ClientError {
    #[error("HTTP request to Dgraph failed")]
    Http(#[from] reqwest::Error),

    #[error("Dgraph returned unexpected HTTP status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("GraphQL request failed: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("GraphQL response contains neither data nor errors")]
    MissingData,

    #[error("failed to (de)serialize GraphQL data")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns `true` if Dgraph reported that it is not ready yet to serve
    /// this kind of operation. That's a transient condition that occurs
    /// while the server is starting.
    pub(crate) fn is_not_ready(&self) -> bool {
        match self {
            ClientError::GraphQl(messages) => messages.iter().any(|m| m.contains(NOT_READY_MARKER)),
            ClientError::Status { body, .. } => body.contains(NOT_READY_MARKER),
            _ => false,
        }
    }
}

/// The operations the rest of the application needs from the database.
pub(crate) trait GraphQl {
    /// Sends `body` as is to the `/alter` endpoint. Only success or failure
    /// is reported, the response data is ignored.
    fn alter(&self, body: &str) -> impl Future<Output = Result<(), ClientError>>;

    /// Executes the GraphQL `document` (query or mutation) with optional
    /// `variables` in the given namespace and deserializes the `data` member
    /// of the response into `T`.
    fn query<T: DeserializeOwned>(
        &self,
        ns: Namespace,
        document: &str,
        variables: Option<serde_json::Value>,
    ) -> impl Future<Output = Result<T, ClientError>>;
}
