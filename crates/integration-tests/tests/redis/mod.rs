//! The same client lifecycle against the redis store, shared between server instances.

use integration_tests::*;
use serde_json::json as body;

#[tokio::test]
async fn client_lifecycle() {
    let server = TestServer::builder()
        .redis(&unique_key_prefix("lifecycle"))
        .build()
        .await;

    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);

    let (status, response) = json(
        server
            .client
            .post("/api/clients", &body!({ "name": "alice", "protocol": "v2ray" }))
            .await,
    )
    .await;

    assert_eq!(status, 409);
    assert_eq!(response["error"]["type"], "conflict_error");

    let (status, response) = json(server.client.get("/api/clients/alice").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, { ".created" => "[created]" }, @r#"
    {
      "created": "[created]",
      "name": "alice",
      "protocol": "openvpn"
    }
    "#);

    let response = server.client.delete("/api/clients/alice").await;
    assert_eq!(response.status(), 200);

    let response = server.client.delete("/api/clients/alice").await;
    assert_eq!(response.status(), 404);

    let (_, response) = json(server.client.get("/api/clients").await).await;
    assert_eq!(response["clients"], body!([]));
}

#[tokio::test]
async fn concurrent_creates_provision_once() {
    let server = TestServer::builder()
        .redis(&unique_key_prefix("concurrent"))
        .build()
        .await;

    let request = body!({ "name": "alice" });

    let (first, second) = tokio::join!(
        server.client.post("/api/clients", &request),
        server.client.post("/api/clients", &request),
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort();

    assert_eq!(statuses, [201, 409]);
}

#[tokio::test]
async fn registry_is_shared_between_instances() {
    let key_prefix = unique_key_prefix("shared");

    let first = TestServer::builder().redis(&key_prefix).build().await;

    let response = first
        .client
        .post("/api/clients", &body!({ "name": "bob", "protocol": "shadowsocks" }))
        .await;

    assert_eq!(response.status(), 201);

    let second = TestServer::builder().redis(&key_prefix).build().await;

    let (status, response) = json(second.client.get("/api/clients/bob").await).await;

    assert_eq!(status, 200);
    assert_eq!(response["protocol"], "shadowsocks");
}

#[tokio::test]
async fn stored_admin_credential_survives_restart() {
    let key_prefix = unique_key_prefix("admin");

    let first = TestServer::builder().redis(&key_prefix).build().await;

    let response = first.client.get("/api/clients").await;
    assert_eq!(response.status(), 200);

    // A changed password in the configuration does not replace the stored hash.
    let second = TestServer::builder()
        .redis(&key_prefix)
        .admin_password("a-different-password")
        .build()
        .await;

    let response = second.client.get("/api/clients").await;
    assert_eq!(response.status(), 401);

    let response = second
        .client
        .anonymous()
        .with_credentials(ADMIN_USER, ADMIN_PASSWORD)
        .get("/api/clients")
        .await;

    assert_eq!(response.status(), 200);
}
