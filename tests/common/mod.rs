//! Shared utilities for host integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use demo_host::{Host, HostOptions, Shutdown, StartupError};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Base settings: a file database inside `dir` and an ephemeral port.
pub fn base_settings(dir: &Path) -> Value {
    json!({
        "ConnectionStrings": {
            "Default": format!("sqlite://{}?mode=rwc", dir.join("test.db").display())
        },
        "Host": { "BindAddress": "127.0.0.1:0" }
    })
}

/// Create a content root holding `appsettings.json` (built from
/// [`base_settings`] and `edit`) and a small `wwwroot`.
pub fn content_root(edit: impl FnOnce(&mut Value)) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = base_settings(dir.path());
    edit(&mut settings);
    write_json(dir.path(), "appsettings.json", &settings);

    fs::create_dir_all(dir.path().join("wwwroot/css")).unwrap();
    fs::write(dir.path().join("wwwroot/css/site.css"), "body { margin: 0; }\n").unwrap();
    dir
}

pub fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn options(dir: &TempDir, environment: &str) -> HostOptions {
    HostOptions::new(dir.path()).with_environment(environment)
}

/// A host serving on an ephemeral port.
pub struct TestHost {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), StartupError>>,
}

impl TestHost {
    pub async fn start(options: HostOptions) -> Self {
        let host = Host::build(options).unwrap();
        let listener = host.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let handle = tokio::spawn(host.run(listener, receiver));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the host to finish.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.trigger();
        self.handle.await.unwrap()
    }
}

/// Client that does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
