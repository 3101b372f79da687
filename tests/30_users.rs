mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn alice() -> Value {
    json!({
        "username": "alice",
        "password": "wonderland",
        "realName": "Alice Liddell",
        "department": "research",
        "position": "lead",
    })
}

async fn create_alice(server: &common::TestServer) -> Result<String> {
    let res = server.client.post(server.url("/users")).json(&alice()).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = common::json_body(res).await?;
    Ok(body["data"]["id"].as_str().expect("user id").to_string())
}

#[tokio::test]
async fn create_user_hides_password() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.post(server.url("/users")).json(&alice()).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = common::json_body(res).await?;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["realName"], "Alice Liddell");
    assert!(body["data"].get("password").is_none(), "password leaked: {}", body);
    assert!(body["data"]["createdAt"].is_string());
    assert!(body["data"]["updatedAt"].is_string());

    let res = server.client.get(server.url("/users")).send().await?;
    let body = common::json_body(res).await?;
    assert_eq!(body["count"], 1);
    assert!(body["data"][0].get("password").is_none(), "password leaked: {}", body);

    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    create_alice(&server).await?;

    let res = server.client.post(server.url("/users")).json(&alice()).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(res).await?;
    assert_eq!(body["message"], "Username already exists");

    let res = server.client.get(server.url("/users")).send().await?;
    let body = common::json_body(res).await?;
    assert_eq!(body["count"], 1);

    Ok(())
}

#[tokio::test]
async fn missing_credentials_are_rejected() -> Result<()> {
    let server = common::spawn_server().await?;

    for body in [json!({ "username": "bob" }), json!({ "password": "x" }), json!({ "username": "", "password": "x" })] {
        let res = server.client.post(server.url("/users")).json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", body);
        let body = common::json_body(res).await?;
        assert_eq!(body["message"], "username and password are required");
    }

    Ok(())
}

#[tokio::test]
async fn login_matches_the_full_triple() -> Result<()> {
    let server = common::spawn_server().await?;
    create_alice(&server).await?;

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "alice", "password": "wonderland", "department": "research" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::json_body(res).await?;
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password").is_none(), "password leaked: {}", body);

    // Surrounding whitespace is trimmed the same way as on create
    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "  alice ", "password": "wonderland", "department": "research" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "alice", "password": "wonderland", "department": "sales" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "alice", "password": "nope", "department": "research" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "alice", "password": "wonderland" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn show_update_delete_user() -> Result<()> {
    let server = common::spawn_server().await?;
    let id = create_alice(&server).await?;

    let res = server.client.get(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::json_body(res).await?;
    assert_eq!(body["data"]["id"], Value::String(id.clone()));

    let res = server
        .client
        .put(server.url(&format!("/users/{}", id)))
        .json(&json!({ "position": "director" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::json_body(res).await?;
    assert_eq!(body["data"]["position"], "director");
    assert_eq!(body["data"]["department"], "research");
    assert!(body["data"].get("password").is_none(), "password leaked: {}", body);

    let res = server.client.delete(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.delete(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.get(server.url("/users/not-a-uuid")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn roles_crud_with_unique_code() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .post(server.url("/roles"))
        .json(&json!({ "name": "Administrator", "code": "admin", "description": "everything" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = common::json_body(res).await?;
    let id = body["data"]["id"].as_str().expect("role id").to_string();

    let res = server
        .client
        .post(server.url("/roles"))
        .json(&json!({ "name": "Other", "code": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "duplicate code must be rejected");

    let res = server
        .client
        .post(server.url("/roles"))
        .json(&json!({ "name": "No code" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .put(server.url(&format!("/roles/{}", id)))
        .json(&json!({ "description": "most things" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::json_body(res).await?;
    assert_eq!(body["data"]["description"], "most things");
    assert_eq!(body["data"]["code"], "admin");

    let res = server.client.get(server.url("/roles")).send().await?;
    let body = common::json_body(res).await?;
    assert_eq!(body["count"], 1);

    let res = server.client.delete(server.url(&format!("/roles/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.client.get(server.url(&format!("/roles/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}
