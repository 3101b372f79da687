mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use docstore_api::config::CollectionAccess;
use docstore_api::database::memory::MemoryDocumentStore;
use docstore_api::database::StoreHandle;

async fn spawn_token_server(token: Option<&str>) -> Result<common::TestServer> {
    let mut config = common::test_config();
    config.security.collection_access = CollectionAccess::Token;
    config.security.collection_token = token.map(str::to_string);

    let store = StoreHandle::pending();
    store.install(Arc::new(MemoryDocumentStore::new())).await?;
    common::spawn_with(config, store).await
}

#[tokio::test]
async fn token_policy_guards_collection_routes() -> Result<()> {
    let server = spawn_token_server(Some("letmein")).await?;

    let res = server.client.get(server.url("/zxx")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = common::json_body(res).await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = server.client.get(server.url("/zxx")).bearer_auth("wrong").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/zxx"))
        .bearer_auth("letmein")
        .json(&json!({ "name": "a" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.client.get(server.url("/zxx")).bearer_auth("letmein").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn token_policy_leaves_other_routes_open() -> Result<()> {
    let server = spawn_token_server(Some("letmein")).await?;

    for path in ["/health", "/users", "/roles", "/data"] {
        let res = server.client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
    }

    Ok(())
}

#[tokio::test]
async fn token_policy_without_token_denies() -> Result<()> {
    let server = spawn_token_server(None).await?;

    let res = server.client.get(server.url("/zxx")).bearer_auth("anything").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
