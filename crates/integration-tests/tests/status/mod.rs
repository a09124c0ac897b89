use integration_tests::*;
use serde_json::json as body;

#[tokio::test]
async fn service_statuses() {
    let server = TestServer::builder().build().await;

    let (status, response) = json(server.client.get("/api/services").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, @r#"
    {
      "dnscrypt": "stopped",
      "dpi-bypass": "stopped",
      "openvpn": "running",
      "shadowsocks": "stopped",
      "stunnel": "stopped",
      "v2ray": "unknown"
    }
    "#);
}

#[tokio::test]
async fn configured_services_replace_defaults() {
    let server = TestServer::builder()
        .config(indoc::indoc! {r#"
            [services.vpn]
            container = "openvpn-server"

            [services.proxy]
            container = "squid"
        "#})
        .build()
        .await;

    let (status, response) = json(server.client.get("/api/services").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, @r#"
    {
      "proxy": "stopped",
      "vpn": "running"
    }
    "#);
}

#[tokio::test]
async fn stats() {
    let server = TestServer::builder().build().await;

    for name in ["alice", "bob"] {
        let response = server
            .client
            .post("/api/clients", &body!({ "name": name, "protocol": "v2ray" }))
            .await;

        assert_eq!(response.status(), 201);
    }

    let (status, response) = json(server.client.get("/api/stats").await).await;

    assert_eq!(status, 200);
    insta::assert_json_snapshot!(response, @r#"
    {
      "services": {
        "dnscrypt": "stopped",
        "dpi-bypass": "stopped",
        "openvpn": "running",
        "shadowsocks": "stopped",
        "stunnel": "stopped",
        "v2ray": "unknown"
      },
      "total_clients": 2,
      "uptime": "up 3 days, 4 hours"
    }
    "#);
}
