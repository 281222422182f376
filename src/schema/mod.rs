//! Making sure the GraphQL schema installed in Dgraph is the one this
//! application expects.

use std::{borrow::Cow, fmt, time::Duration};

use tokio::time::Instant;

use crate::{
    db::{ClientError, GraphQl, Namespace},
    prelude::*,
};

mod canon;
pub(crate) mod cmd;

pub(crate) use self::canon::CANON;


/// How long to wait before asking a not-yet-ready Dgraph again.
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(2);

const GET_SCHEMA_QUERY: &str = "query { getGQLSchema { schema } }";

const UPDATE_SCHEMA_MUTATION: &str = "mutation updateGQLSchema($schema: String!) {
    updateGQLSchema(input: {
        set: { schema: $schema }
    }) {
        gqlSchema {
            schema
        }
    }
}";

const DROP_ALL: &str = r#"{"drop_all": true}"#;


#[derive(Debug, confique::Config)]
pub(crate) struct SchemaConfig {
    /// How long schema commands wait for Dgraph to accept schema operations.
    /// Right after Dgraph starts, it rejects those for a while. During that
    /// time, we retry every two seconds until this timeout is reached. "0"
    /// means waiting forever.
    #[config(default = "1min", deserialize_with = crate::config::deserialize_duration)]
    pub(crate) ready_timeout: Duration,
}

impl SchemaConfig {
    /// A deadline `ready_timeout` from now.
    pub(crate) fn deadline(&self) -> Deadline {
        if self.ready_timeout.is_zero() {
            Deadline::never()
        } else {
            Deadline::after(self.ready_timeout)
        }
    }
}


/// Point in time after which waiting for Dgraph to become ready is given up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub(crate) fn never() -> Self {
        Self(None)
    }

    pub(crate) fn has_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}


#[derive(Debug, thiserror::Error)]
pub(crate) enum SchemaError {
    /// Dgraph kept rejecting schema operations until the deadline expired.
    #[error("server not ready for schema operations")]
    NotReady(#[source] ClientError),

    /// Dgraph has no GraphQL schema installed. Expected for a fresh database.
    #[error("no schema exists")]
    NoSchema,

    #[error("schema doesn't match ({0})")]
    Invalid(InvalidReason),

    /// Any other failure talking to Dgraph. `op` describes what we tried.
    #[error("{op}")]
    Transport {
        op: &'static str,
        #[source]
        source: ClientError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvalidReason {
    /// The response is too short to even contain a schema document.
    TooShort,
    /// The installed schema differs from the expected one.
    Mismatch,
    /// Still no schema installed after we set it.
    MissingAfterUpdate,
    /// A schema is still installed after dropping everything.
    PresentAfterDrop,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvalidReason::TooShort => "response too short to contain a schema",
            InvalidReason::Mismatch => "installed schema differs from expected one",
            InvalidReason::MissingAfterUpdate => "no schema installed after updating it",
            InvalidReason::PresentAfterDrop => "schema still installed after dropping everything",
        })
    }
}

/// What we found when comparing the installed schema with the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchemaState {
    Missing,
    UpToDate,
    Outdated(InvalidReason),
}


/// Retrieves, checks, installs and drops the Dgraph schema.
pub(crate) struct Synchronizer<C> {
    client: C,
    document: Cow<'static, str>,
}

impl<C: GraphQl> Synchronizer<C> {
    /// Creates a synchronizer that manages the schema in [`CANON`].
    pub(crate) fn new(client: C) -> Self {
        Self::with_document(client, CANON)
    }

    pub(crate) fn with_document(client: C, document: impl Into<Cow<'static, str>>) -> Self {
        Self {
            client,
            document: document.into(),
        }
    }

    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Makes sure the installed schema matches the expected one. Does not
    /// write anything if it already does, so this is cheap to call on every
    /// start. After writing, the schema is read back and checked again.
    pub(crate) async fn create(&self, deadline: &Deadline) -> Result<(), SchemaError> {
        let live = self.retrieve(deadline).await?;
        match self.validate(&live) {
            Ok(()) => {
                info!("Dgraph schema is up to date -> nothing to do");
                return Ok(());
            }
            Err(SchemaError::NoSchema) => info!("Dgraph has no schema yet -> installing it"),
            Err(SchemaError::Invalid(reason)) => {
                info!(%reason, "Dgraph schema is outdated -> replacing it");
            }
            Err(e) => return Err(e),
        }

        let variables = serde_json::json!({ "schema": self.document });
        self.client
            .query::<serde_json::Value>(Namespace::Admin, UPDATE_SCHEMA_MUTATION, Some(variables))
            .await
            .map_err(|source| SchemaError::Transport { op: "updating schema", source })?;
        debug!("Sent new schema to Dgraph, reading it back to verify");

        let live = self.retrieve(deadline).await?;
        match self.validate(&live) {
            Ok(()) => {
                info!("Installed schema in Dgraph");
                Ok(())
            }
            Err(SchemaError::NoSchema) => Err(SchemaError::Invalid(InvalidReason::MissingAfterUpdate)),
            Err(e) => Err(e),
        }
    }

    /// Removes all data and the schema from Dgraph and verifies that nothing
    /// remains.
    pub(crate) async fn drop_all(&self, deadline: &Deadline) -> Result<(), SchemaError> {
        warn!("Dropping all data and the schema from Dgraph");
        self.client.alter(DROP_ALL)
            .await
            .map_err(|source| SchemaError::Transport { op: "dropping schema and data", source })?;

        let live = self.retrieve(deadline).await?;
        match self.validate(&live) {
            Err(SchemaError::NoSchema) => {
                info!("Dropped all data and the schema from Dgraph");
                Ok(())
            }
            Ok(()) | Err(SchemaError::Invalid(_)) => {
                Err(SchemaError::Invalid(InvalidReason::PresentAfterDrop))
            }
            Err(e) => Err(e),
        }
    }

    /// Compares the installed schema with the expected one without changing
    /// anything.
    pub(crate) async fn status(&self, deadline: &Deadline) -> Result<SchemaState, SchemaError> {
        let live = self.retrieve(deadline).await?;
        match self.validate(&live) {
            Ok(()) => Ok(SchemaState::UpToDate),
            Err(SchemaError::NoSchema) => Ok(SchemaState::Missing),
            Err(SchemaError::Invalid(reason)) => Ok(SchemaState::Outdated(reason)),
            Err(e) => Err(e),
        }
    }

    /// Fetches the installed schema, serialized as the JSON response data,
    /// e.g. `{"getGQLSchema":{"schema":"..."}}`.
    ///
    /// While Dgraph reports that it is not ready yet, this retries every
    /// [`RETRY_DELAY`]. The deadline is checked before each retry: if it has
    /// expired, `NotReady` is returned. All other errors are returned
    /// immediately.
    pub(crate) async fn retrieve(&self, deadline: &Deadline) -> Result<String, SchemaError> {
        let mut attempts = 1u32;
        loop {
            let err = match self.query_schema().await {
                Ok(schema) => return Ok(schema),
                Err(e) if e.is_not_ready() => e,
                Err(source) => return Err(SchemaError::Transport { op: "querying schema", source }),
            };

            if deadline.has_expired() {
                return Err(SchemaError::NotReady(err));
            }

            debug!(
                "Dgraph is not ready for schema operations yet (attempt {attempts}), \
                    retrying in {RETRY_DELAY:?}",
            );
            tokio::time::sleep(RETRY_DELAY).await;
            attempts += 1;
        }
    }

    /// Checks the output of [`Self::retrieve`] against the expected schema.
    pub(crate) fn validate(&self, live: &str) -> Result<(), SchemaError> {
        canon::classify(&self.document, live)
    }

    async fn query_schema(&self) -> Result<String, ClientError> {
        let data = self.client
            .query::<serde_json::Value>(Namespace::Admin, GET_SCHEMA_QUERY, None)
            .await?;
        trace!("Installed schema: {data}");

        serde_json::to_string(&data).map_err(Into::into)
    }
}
