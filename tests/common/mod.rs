#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "integration-password";

/// A server process on its own port, killed when dropped
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    /// Start the binary without a database
    pub async fn start() -> Result<Self> {
        Self::start_with_database(None).await
    }

    pub async fn start_with_database(database_url: Option<&str>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_finance-dashboard"));
        // an empty DATABASE_URL counts as unset and keeps a local .env from filling it in
        cmd.env("DASHBOARD_API_PORT", port.to_string())
            .env("JWT_SECRET", JWT_SECRET)
            .env("DASHBOARD_PASSWORD", PASSWORD)
            .env("DATABASE_URL", database_url.unwrap_or(""))
            .env("RUST_LOG", "warn")
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        let server = Self { port, base_url, child };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Log in with the configured password and return the token
    pub async fn login(&self, client: &reqwest::Client) -> Result<String> {
        let body: Value = client
            .post(self.url("/login"))
            .json(&json!({ "password": PASSWORD }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body["token"]
            .as_str()
            .map(String::from)
            .context("login response has no token")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
