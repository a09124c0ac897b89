use integration_tests::*;
use serde_json::json as body;

#[tokio::test]
async fn create_openvpn_client() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(server.client.post("/api/clients", &body!({ "name": "alice" })).await).await;

    assert_eq!(status, 201);
    insta::assert_json_snapshot!(response, { ".client.created" => "[created]" }, @r#"
    {
      "client": {
        "created": "[created]",
        "name": "alice",
        "protocol": "openvpn"
      },
      "message": "Client alice created successfully",
      "success": true
    }
    "#);

    assert!(exists(&server.artifact_path("alice")));

    let (status, response) = json(server.client.get("/api/clients/alice").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, { ".created" => "[created]" }, @r#"
    {
      "created": "[created]",
      "name": "alice",
      "protocol": "openvpn"
    }
    "#);
}

#[tokio::test]
async fn created_timestamp_is_rfc3339() {
    let server = TestServer::builder().build().await;

    let (_, response) = json(server.client.post("/api/clients", &body!({ "name": "alice" })).await).await;
    let created = response["client"]["created"].as_str().unwrap();

    assert!(created.parse::<jiff::Timestamp>().is_ok(), "{created}");
}

#[tokio::test]
async fn create_shadowsocks_client() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(
        server
            .client
            .post("/api/clients", &body!({ "name": "bob", "protocol": "shadowsocks" }))
            .await,
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(response["client"]["protocol"], "shadowsocks");

    // Shared-secret protocols never reach the certificate backend.
    assert!(!exists(&server.artifact_path("bob")));
}

#[tokio::test]
async fn duplicate_client() {
    let server = TestServer::builder().build().await;

    let response = server
        .client
        .post("/api/clients", &body!({ "name": "alice", "protocol": "v2ray" }))
        .await;

    assert_eq!(response.status(), 201);

    let (status, response) = json(server.client.post("/api/clients", &body!({ "name": "alice" })).await).await;

    assert_eq!(status, 409);
    insta::assert_json_snapshot!(response, @r#"
    {
      "error": {
        "code": 409,
        "message": "client 'alice' already exists",
        "type": "conflict_error"
      },
      "success": false
    }
    "#);

    // The first registration is untouched.
    let (_, response) = json(server.client.get("/api/clients/alice").await).await;
    assert_eq!(response["protocol"], "v2ray");
    assert!(!exists(&server.artifact_path("alice")));
}

#[tokio::test]
async fn concurrent_creates_provision_once() {
    let server = TestServer::builder().build().await;
    let request = body!({ "name": "alice" });

    let (first, second) = tokio::join!(
        server.client.post("/api/clients", &request),
        server.client.post("/api/clients", &request),
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort();

    assert_eq!(statuses, [201, 409]);

    let (_, response) = json(server.client.get("/api/clients").await).await;
    assert_eq!(response["clients"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unsupported_protocol() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(
        server
            .client
            .post("/api/clients", &body!({ "name": "alice", "protocol": "ipsec" }))
            .await,
    )
    .await;

    assert_eq!(status, 400);
    insta::assert_json_snapshot!(response, @r#"
    {
      "error": {
        "code": 400,
        "message": "unsupported protocol 'ipsec', expected one of: openvpn, shadowsocks, v2ray",
        "type": "invalid_request_error"
      },
      "success": false
    }
    "#);

    let response = server.client.get("/api/clients/alice").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn invalid_client_name() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(server.client.post("/api/clients", &body!({ "name": "../etc/passwd" })).await).await;

    assert_eq!(status, 400);
    insta::assert_json_snapshot!(response, @r#"
    {
      "error": {
        "code": 400,
        "message": "invalid client name '../etc/passwd': use 1-64 letters, digits, '_', '.' or '-', starting with a letter or digit",
        "type": "invalid_request_error"
      },
      "success": false
    }
    "#);

    let response = server.client.post("/api/clients", &body!({ "name": "" })).await;
    assert_eq!(response.status(), 400);

    let response = server.client.get("/api/clients/-alice").await;
    assert_eq!(response.status(), 400);

    let response = server.client.delete("/api/clients/-alice").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn malformed_request_body() {
    let server = TestServer::builder().build().await;

    let response = server
        .client
        .post("/api/clients", &body!({ "name": "alice", "admin": true }))
        .await;

    assert_eq!(response.status(), 400);

    let response = server.client.post("/api/clients", &body!({ "protocol": "openvpn" })).await;
    assert_eq!(response.status(), 400);

    let (status, response) = json(server.client.get("/api/clients").await).await;

    assert_eq!(status, 200);
    assert_eq!(response["clients"], body!([]));
}

#[tokio::test]
async fn failed_issuance_registers_nothing() {
    let server = TestServer::builder().failing_issue().build().await;

    let (status, response) = json(server.client.post("/api/clients", &body!({ "name": "alice" })).await).await;

    assert_eq!(status, 502);
    insta::assert_json_snapshot!(response, @r#"
    {
      "error": {
        "code": 502,
        "message": "Backend command failed: easyrsa: CA not initialized",
        "type": "backend_error"
      },
      "success": false
    }
    "#);

    let response = server.client.get("/api/clients/alice").await;
    assert_eq!(response.status(), 404);

    // Nothing is left claimed, a retry reaches the backend again.
    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn list_clients_sorted() {
    let server = TestServer::builder().build().await;

    for (name, protocol) in [("carol", "v2ray"), ("alice", "openvpn"), ("bob", "shadowsocks")] {
        let response = server
            .client
            .post("/api/clients", &body!({ "name": name, "protocol": protocol }))
            .await;

        assert_eq!(response.status(), 201);
    }

    let (status, response) = json(server.client.get("/api/clients").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, { ".clients[].created" => "[created]" }, @r#"
    {
      "clients": [
        {
          "created": "[created]",
          "name": "alice",
          "protocol": "openvpn"
        },
        {
          "created": "[created]",
          "name": "bob",
          "protocol": "shadowsocks"
        },
        {
          "created": "[created]",
          "name": "carol",
          "protocol": "v2ray"
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn get_unknown_client() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(server.client.get("/api/clients/ghost").await).await;

    assert_eq!(status, 404);
    insta::assert_json_snapshot!(response, @r#"
    {
      "error": {
        "code": 404,
        "message": "client 'ghost' not found",
        "type": "not_found_error"
      },
      "success": false
    }
    "#);
}

#[tokio::test]
async fn download_config() {
    let server = TestServer::builder().build().await;

    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);

    let response = server.client.get("/api/clients/alice/config").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/octet-stream");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"alice.ovpn\""
    );

    let content = response.text().await.unwrap();

    insta::assert_snapshot!(content, @r"
    client
    remote vpn.example.com 1194
    ");
}

#[tokio::test]
async fn config_of_unknown_client() {
    let server = TestServer::builder().build().await;

    let response = server.client.get("/api/clients/ghost/config").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn config_of_shared_secret_client() {
    let server = TestServer::builder().build().await;

    let response = server
        .client
        .post("/api/clients", &body!({ "name": "bob", "protocol": "shadowsocks" }))
        .await;

    assert_eq!(response.status(), 201);

    let response = server.client.get("/api/clients/bob/config").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn config_missing_on_disk() {
    let server = TestServer::builder().build().await;

    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);

    std::fs::remove_file(server.artifact_path("alice")).unwrap();

    let response = server.client.get("/api/clients/alice/config").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn delete_client() {
    let server = TestServer::builder().build().await;

    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);

    let (status, response) = json(server.client.delete("/api/clients/alice").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, @r#"
    {
      "message": "Client alice deleted successfully",
      "success": true
    }
    "#);

    assert!(!exists(&server.artifact_path("alice")));

    let response = server.client.get("/api/clients/alice").await;
    assert_eq!(response.status(), 404);

    // The name is free again.
    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn delete_with_failing_revocation() {
    let server = TestServer::builder().failing_revoke().build().await;

    let response = server.client.post("/api/clients", &body!({ "name": "alice" })).await;
    assert_eq!(response.status(), 201);

    let (status, response) = json(server.client.delete("/api/clients/alice").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, @r#"
    {
      "message": "Client alice deleted successfully",
      "success": true,
      "warning": "certificate revocation failed: Unable to revoke: no certificate found"
    }
    "#);

    let response = server.client.get("/api/clients/alice").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn delete_unknown_client() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(server.client.delete("/api/clients/ghost").await).await;

    assert_eq!(status, 404);
    assert_eq!(response["error"]["type"], "not_found_error");
}
