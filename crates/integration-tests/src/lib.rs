use std::{path::Path, time::Duration};

use config::Config;
use server::ServeConfig;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery-staple";

/// Redis started next to the test suite.
pub const REDIS_URL: &str = "redis://localhost:6379/0";

/// Writes `<name>.ovpn` into the artifact directory passed as `$1`.
const ISSUE_SCRIPT: &str = "printf 'client\\nremote vpn.example.com 1194\\n' > \"$1/$0.ovpn\"";
const ISSUE_FAILURE_SCRIPT: &str = "echo 'easyrsa: CA not initialized' >&2; exit 1";
const REVOKE_SCRIPT: &str = "rm -f \"$1/$0.ovpn\"";
const REVOKE_FAILURE_SCRIPT: &str = "echo 'Unable to revoke: no certificate found' >&2; exit 1";

/// openvpn runs, v2ray cannot be queried, everything else is stopped.
const STATUS_SCRIPT: &str =
    "case \"$0\" in openvpn-server) echo 'Up 2 hours';; v2ray-server) echo 'daemon unreachable' >&2; exit 1;; esac";

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
    credentials: Option<(String, String)>,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            credentials: None,
        }
    }

    /// Sends HTTP Basic credentials with every request
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// A copy of this client that sends no credentials
    pub fn anonymous(&self) -> Self {
        Self {
            credentials: None,
            ..self.clone()
        }
    }

    /// Create a request with the given method and path
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.request(method, format!("{}{}", self.base_url, path));

        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path).send().await.unwrap()
    }

    /// Send a GET request to the given path, returning Result instead of panicking
    pub async fn try_get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path).send().await
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a DELETE request to the given path
    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::DELETE, path).send().await.unwrap()
    }
}

/// Reads a response as status code and JSON body.
pub async fn json(response: reqwest::Response) -> (u16, serde_json::Value) {
    let status = response.status().as_u16();
    let body = response.json().await.unwrap();

    (status, body)
}

pub struct TestServer {
    pub client: TestClient,
    /// Directory the issue command writes client configs into
    pub artifacts: TempDir,
    /// Handle to the main server task
    _server_task_handle: tokio::task::JoinHandle<()>,
    /// Shutdown signal for the main server
    shutdown_signal: CancellationToken,
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start a new test server with the given TOML configuration
    #[allow(clippy::panic)]
    async fn start(config_toml: &str, artifacts: TempDir, credentials: Option<(&str, &str)>) -> Self {
        // Write config to a temporary file and use the proper loader to ensure validation
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, config_toml).unwrap();

        let config = Config::load(&config_path).unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let shutdown_signal = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown_signal: shutdown_signal.clone(),
            log_filter: "server=debug,coordinator=debug,registry=debug,gateway=debug,config=debug".to_string(),
        };

        // Start the server in a background task
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let server_task_handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            let _ = tx.send(server::serve(serve_config).await);
        });

        let mut client = TestClient::new(format!("http://{address}"));

        if let Some((username, password)) = credentials {
            client = client.with_credentials(username, password);
        }

        // Verify the server is actually running by making a simple request
        let mut last_error = None;

        for _ in 0..50 {
            if let Ok(Err(e)) = rx.try_recv() {
                panic!("Server failed to start: {e}");
            }

            match client.try_get("/health").await {
                Ok(_) => {
                    return TestServer {
                        client,
                        artifacts,
                        _server_task_handle: server_task_handle,
                        shutdown_signal,
                    };
                }
                Err(e) => last_error = Some(e),
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        panic!("Server failed to become ready. Last error: {last_error:?}");
    }

    /// Path of the config file the issue command writes for `name`
    pub fn artifact_path(&self, name: &str) -> std::path::PathBuf {
        self.artifacts.path().join(format!("{name}.ovpn"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_signal.cancel();
    }
}

/// Builds the configuration for a test server backed by the in-memory store
/// and small shell scripts standing in for the VPN backends.
pub struct TestServerBuilder {
    issue_script: &'static str,
    revoke_script: &'static str,
    auth: bool,
    admin_password: &'static str,
    store: String,
    extra: String,
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self {
            issue_script: ISSUE_SCRIPT,
            revoke_script: REVOKE_SCRIPT,
            auth: true,
            admin_password: ADMIN_PASSWORD,
            store: "type = \"memory\"".to_string(),
            extra: String::new(),
        }
    }
}

impl TestServerBuilder {
    /// The certificate backend rejects every issuance
    pub fn failing_issue(mut self) -> Self {
        self.issue_script = ISSUE_FAILURE_SCRIPT;
        self
    }

    /// The certificate backend rejects every revocation
    pub fn failing_revoke(mut self) -> Self {
        self.revoke_script = REVOKE_FAILURE_SCRIPT;
        self
    }

    pub fn without_auth(mut self) -> Self {
        self.auth = false;
        self
    }

    /// Keeps the registry in the local test redis under `key_prefix`
    pub fn redis(mut self, key_prefix: &str) -> Self {
        self.store = indoc::formatdoc! {r#"
            type = "redis"
            url = "{REDIS_URL}"
            key_prefix = {key_prefix}
        "#,
            key_prefix = toml_string(key_prefix),
        };
        self
    }

    /// Password configured for the admin user, also used by the test client
    pub fn admin_password(mut self, password: &'static str) -> Self {
        self.admin_password = password;
        self
    }

    /// Appends raw TOML to the generated configuration
    pub fn config(mut self, toml: &str) -> Self {
        self.extra.push('\n');
        self.extra.push_str(toml);
        self
    }

    pub async fn build(self) -> TestServer {
        let artifacts = tempfile::tempdir().unwrap();
        let directory = artifacts.path().to_string_lossy().into_owned();

        let mut config = indoc::formatdoc! {r#"
            [store]
            {store}

            [provisioning]
            issue = {issue}
            revoke = {revoke}

            [provisioning.artifacts]
            directory = {directory}

            [status]
            query = {query}
            uptime = ["echo", "up 3 days, 4 hours"]
        "#,
            issue = command(self.issue_script, &["{name}", &directory]),
            revoke = command(self.revoke_script, &["{name}", &directory]),
            directory = toml_string(&directory),
            query = command(STATUS_SCRIPT, &["{service}"]),
            store = self.store,
        };

        if self.auth {
            config.push_str(&indoc::formatdoc! {r#"

                [admin]
                username = "{ADMIN_USER}"
                password = {password}
            "#,
                password = toml_string(self.admin_password),
            });
        } else {
            config.push_str(indoc::indoc! {r#"

                [server.auth]
                enabled = false
            "#});
        }

        config.push_str(&self.extra);

        let credentials = self.auth.then_some((ADMIN_USER, self.admin_password));

        TestServer::start(&config, artifacts, credentials).await
    }
}

/// `sh -c <script> <args...>` as a TOML array.
fn command(script: &str, args: &[&str]) -> String {
    let argv: Vec<&str> = ["sh", "-c", script].into_iter().chain(args.iter().copied()).collect();

    // JSON string escapes are valid in TOML basic strings.
    serde_json::to_string(&argv).unwrap()
}

fn toml_string(value: &str) -> String {
    serde_json::to_string(value).unwrap()
}

/// A key prefix no other test uses, so tests can share one redis.
pub fn unique_key_prefix(test: &str) -> String {
    format!("test_{test}_{:016x}:", rand::random::<u64>())
}

/// Whether `path` exists, for asserting on backend side effects.
pub fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}
