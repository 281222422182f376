use std::{collections::VecDeque, sync::Mutex};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::db::{ClientError, GraphQl, Namespace, NOT_READY_MARKER};


/// In-memory stand-in for Dgraph. Schema operations behave like the real
/// thing (modulo the knobs below), everything sent to `/graphql` is answered
/// from a queue of canned responses.
#[derive(Default)]
pub(crate) struct FakeDb {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    schema: Option<String>,

    /// Number of schema queries that are still answered with "not ready".
    not_ready_answers: u32,
    /// If set, all schema queries fail with this message.
    broken: Option<String>,
    /// If set, updating the schema stores this instead of the sent schema.
    garble_updates_to: Option<String>,
    /// If set, `drop_all` does not remove the schema.
    ignore_drop: bool,

    schema_queries: u32,
    schema_updates: u32,
    alters: Vec<String>,

    responses: VecDeque<Result<Value, ClientError>>,
    requests: Vec<(String, Option<Value>)>,
}

impl FakeDb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_schema(schema: &str) -> Self {
        let db = Self::new();
        db.state().schema = Some(schema.to_owned());
        db
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn not_ready_for(&self, answers: u32) -> &Self {
        self.state().not_ready_answers = answers;
        self
    }

    pub(crate) fn broken(&self, message: &str) -> &Self {
        self.state().broken = Some(message.to_owned());
        self
    }

    pub(crate) fn garble_updates_to(&self, schema: &str) -> &Self {
        self.state().garble_updates_to = Some(schema.to_owned());
        self
    }

    pub(crate) fn ignore_drop(&self) -> &Self {
        self.state().ignore_drop = true;
        self
    }

    /// Queues the answer to the next request in the `Graphql` namespace.
    pub(crate) fn respond(&self, response: Result<Value, ClientError>) -> &Self {
        self.state().responses.push_back(response);
        self
    }

    pub(crate) fn schema(&self) -> Option<String> {
        self.state().schema.clone()
    }

    pub(crate) fn schema_queries(&self) -> u32 {
        self.state().schema_queries
    }

    pub(crate) fn schema_updates(&self) -> u32 {
        self.state().schema_updates
    }

    pub(crate) fn alters(&self) -> Vec<String> {
        self.state().alters.clone()
    }

    /// All documents and variables sent to the `Graphql` namespace.
    pub(crate) fn requests(&self) -> Vec<(String, Option<Value>)> {
        self.state().requests.clone()
    }
}

pub(crate) fn not_ready_error() -> ClientError {
    ClientError::GraphQl(vec![format!("Unavailable: {NOT_READY_MARKER}, please retry later.")])
}

impl GraphQl for FakeDb {
    async fn alter(&self, body: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.alters.push(body.to_owned());
        let parsed: Value = serde_json::from_str(body)?;
        if parsed["drop_all"] == json!(true) && !state.ignore_drop {
            state.schema = None;
        }
        Ok(())
    }

    async fn query<T: DeserializeOwned>(
        &self,
        ns: Namespace,
        document: &str,
        variables: Option<Value>,
    ) -> Result<T, ClientError> {
        let mut state = self.state();
        let data = match ns {
            Namespace::Admin if document.contains("getGQLSchema") => {
                state.schema_queries += 1;
                if let Some(message) = &state.broken {
                    return Err(ClientError::GraphQl(vec![message.clone()]));
                }
                if state.not_ready_answers > 0 {
                    state.not_ready_answers -= 1;
                    return Err(not_ready_error());
                }
                match &state.schema {
                    None => json!({ "getGQLSchema": null }),
                    Some(schema) => json!({ "getGQLSchema": { "schema": schema } }),
                }
            }
            Namespace::Admin if document.contains("updateGQLSchema") => {
                state.schema_updates += 1;
                let sent = variables
                    .as_ref()
                    .and_then(|v| v["schema"].as_str())
                    .expect("schema update without schema variable")
                    .to_owned();
                let stored = state.garble_updates_to.clone().unwrap_or(sent);
                state.schema = Some(stored.clone());
                json!({ "updateGQLSchema": { "gqlSchema": { "schema": stored } } })
            }
            Namespace::Admin => panic!("unexpected admin document: {document}"),
            Namespace::Graphql => {
                state.requests.push((document.to_owned(), variables));
                state.responses.pop_front().expect("no canned response left")?
            }
        };

        serde_json::from_value(data).map_err(Into::into)
    }
}
