use std::time::Duration;

use mockito::Matcher;
use secrecy::SecretString;
use serde_json::{json, Value};

use crate::prelude::*;
use super::{Client, ClientError, DbConfig, GraphQl, Namespace};

pub(crate) mod util;


fn config_for(server: &mockito::ServerGuard, token: Option<&str>) -> DbConfig {
    DbConfig {
        host: server.url().parse().unwrap(),
        auth_token: token.map(|t| SecretString::new(t.into())),
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn query_sends_document_and_variables() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/graphql")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "query": "query($id: ID!) { getAffix(id: $id) { id } }",
            "variables": { "id": "0x1" },
        })))
        .with_status(200)
        .with_body(r#"{"data": {"getAffix": {"id": "0x1"}}}"#)
        .create_async()
        .await;

    let client = Client::new(&config_for(&server, None))?;
    let data: Value = client.query(
        Namespace::Graphql,
        "query($id: ID!) { getAffix(id: $id) { id } }",
        Some(json!({ "id": "0x1" })),
    ).await?;

    assert_eq!(data, json!({ "getAffix": { "id": "0x1" } }));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn auth_token_only_sent_to_admin_endpoints() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let admin = server.mock("POST", "/admin")
        .match_header("X-Dgraph-AuthToken", "hunter2")
        .match_body(Matcher::Json(json!({ "query": "query { getGQLSchema { schema } }" })))
        .with_body(r#"{"data": {"getGQLSchema": null}}"#)
        .create_async()
        .await;
    let alter = server.mock("POST", "/alter")
        .match_header("X-Dgraph-AuthToken", "hunter2")
        .match_body(r#"{"drop_all": true}"#)
        .with_body(r#"{"data": {"code": "Success", "message": "Done"}}"#)
        .create_async()
        .await;
    let graphql = server.mock("POST", "/graphql")
        .match_header("X-Dgraph-AuthToken", Matcher::Missing)
        .with_body(r#"{"data": {"queryAffix": []}}"#)
        .create_async()
        .await;

    let client = Client::new(&config_for(&server, Some("hunter2")))?;
    let schema: Value = client.query(Namespace::Admin, "query { getGQLSchema { schema } }", None)
        .await?;
    assert_eq!(schema, json!({ "getGQLSchema": null }));
    client.alter(r#"{"drop_all": true}"#).await?;
    let _: Value = client.query(Namespace::Graphql, "query { queryAffix { id } }", None).await?;

    admin.assert_async().await;
    alter.assert_async().await;
    graphql.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn graphql_errors_are_errors() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/admin")
        .with_status(200)
        .with_body(r#"{
            "errors": [{"message": "Unavailable: Server not ready.", "extensions": {}}],
            "data": null
        }"#)
        .create_async()
        .await;

    let client = Client::new(&config_for(&server, None))?;
    let err = client.query::<Value>(Namespace::Admin, "query { getGQLSchema { schema } }", None)
        .await
        .unwrap_err();

    assert!(matches!(&err, ClientError::GraphQl(m) if m == &["Unavailable: Server not ready."]));
    assert!(err.is_not_ready());
    Ok(())
}

#[tokio::test]
async fn error_status_codes() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/admin")
        .with_status(503)
        .with_body(r#"{"errors": [{"message": "Server not ready"}]}"#)
        .create_async()
        .await;
    server.mock("POST", "/graphql")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;
    server.mock("POST", "/alter")
        .with_status(500)
        .with_body(r#"{"data": null}"#)
        .create_async()
        .await;

    let client = Client::new(&config_for(&server, None))?;

    let err = client.query::<Value>(Namespace::Admin, "{ x }", None).await.unwrap_err();
    assert!(matches!(err, ClientError::GraphQl(_)));
    assert!(err.is_not_ready());

    let err = client.query::<Value>(Namespace::Graphql, "{ x }", None).await.unwrap_err();
    assert!(matches!(&err, ClientError::Status { status, body }
        if status.as_u16() == 502 && body.contains("Bad Gateway")));
    assert!(!err.is_not_ready());

    let err = client.alter("{}").await.unwrap_err();
    assert!(matches!(err, ClientError::Status { .. }));
    Ok(())
}

#[tokio::test]
async fn missing_data_and_bad_json() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/graphql")
        .with_body(r#"{"extensions": {}}"#)
        .create_async()
        .await;
    server.mock("POST", "/admin")
        .with_body("definitely not JSON")
        .create_async()
        .await;

    let client = Client::new(&config_for(&server, None))?;
    let err = client.query::<Value>(Namespace::Graphql, "{ x }", None).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingData));

    let err = client.query::<Value>(Namespace::Admin, "{ x }", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    Ok(())
}

#[test]
fn invalid_auth_token_is_rejected() {
    let config = DbConfig {
        host: "http://localhost:8080".parse().unwrap(),
        auth_token: Some(SecretString::new("line\nbreak".into())),
        request_timeout: Duration::from_secs(5),
    };
    assert!(Client::new(&config).is_err());
}

#[test]
fn not_ready_detection() {
    assert!(util::not_ready_error().is_not_ready());
    assert!(!ClientError::GraphQl(vec!["resolving getAffix failed".into()]).is_not_ready());
    assert!(!ClientError::MissingData.is_not_ready());
}
