use integration_tests::*;

#[tokio::test]
async fn missing_credentials() {
    let server = TestServer::builder().build().await;

    let response = server.client.anonymous().get("/api/clients").await;

    assert_eq!(response.status(), 401);
    insta::assert_snapshot!(
        response.headers()["www-authenticate"].to_str().unwrap(),
        @r#"Basic realm="vpnadmin", charset="UTF-8""#
    );

    let (_, body) = json(response).await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 401,
        "message": "Unauthorized",
        "type": "authentication_error"
      },
      "success": false
    }
    "#);
}

#[tokio::test]
async fn wrong_password() {
    let server = TestServer::builder().build().await;
    let client = server.client.anonymous().with_credentials(ADMIN_USER, "hunter2");

    let response = client.get("/api/clients").await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn wrong_username() {
    let server = TestServer::builder().build().await;
    let client = server.client.anonymous().with_credentials("root", ADMIN_PASSWORD);

    let response = client.get("/api/clients").await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn rejected_requests_change_nothing() {
    let server = TestServer::builder().build().await;

    let response = server
        .client
        .anonymous()
        .post("/api/clients", &serde_json::json!({ "name": "mallory" }))
        .await;

    assert_eq!(response.status(), 401);
    assert!(!exists(&server.artifact_path("mallory")));

    let (status, body) = json(server.client.get("/api/clients").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(body, @r#"
    {
      "clients": []
    }
    "#);
}

#[tokio::test]
async fn valid_credentials() {
    let server = TestServer::builder().build().await;

    let response = server.client.get("/api/services").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn auth_disabled() {
    let server = TestServer::builder().without_auth().build().await;

    let response = server.client.get("/api/clients").await;
    assert_eq!(response.status(), 200);
}
