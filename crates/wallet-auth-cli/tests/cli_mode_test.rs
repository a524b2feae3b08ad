/*
[INPUT]:  wallet-auth binary, temporary config directory, mock backend
[OUTPUT]: End-to-end results for init, status, login and logout
[POS]:    Integration test layer - command-line front end
[UPDATE]: When subcommands or their output change
*/

use std::path::{Path, PathBuf};

use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wallet-auth-cli-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn wallet_auth(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_wallet-auth"));
    command
        .arg("--config")
        .arg(dir.join("config.yaml"))
        .env("RUST_LOG", "error")
        .env("WALLET_AUTH_TOKEN_FILE", dir.join("session.json"))
        .env("WALLET_AUTH_KEY_DIR", dir.join("keys"));
    command
}

async fn run_json(command: &mut Command) -> (bool, serde_json::Value) {
    let output = command.output().await.expect("run wallet-auth");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    });
    (output.status.success(), value)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cli_init_writes_loadable_config() {
    let dir = temp_dir();

    let output = wallet_auth(&dir)
        .args(["init", "--yes"])
        .output()
        .await
        .expect("run init");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.join("config.yaml").exists());

    // A second init refuses to overwrite without --force
    let output = wallet_auth(&dir)
        .args(["init", "--yes"])
        .output()
        .await
        .expect("run init");
    assert!(!output.status.success());

    let (ok, status) = run_json(wallet_auth(&dir).arg("status")).await;
    assert!(ok);
    assert_eq!(status["authenticated"], false);
    assert_eq!(status["wallet_name"], "default");
    assert!(status["address"].is_null());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cli_login_status_logout_roundtrip() {
    let dir = temp_dir();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/wallet"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"token": "cli-token"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    std::fs::write(
        dir.join("config.yaml"),
        format!("api_base_url: {}/api/\napp_name: CLI Test\n", server.uri()),
    )
    .expect("write config");

    let (ok, outcome) = run_json(wallet_auth(&dir).args(["login", "--yes"])).await;
    assert!(ok, "{outcome}");
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["token"], "cli-token");

    let (_, status) = run_json(wallet_auth(&dir).arg("status")).await;
    assert_eq!(status["authenticated"], true);
    assert!(status["address"].is_string());

    let (ok, logout) = run_json(wallet_auth(&dir).arg("logout")).await;
    assert!(ok);
    assert_eq!(logout["was_authenticated"], true);

    let (_, status) = run_json(wallet_auth(&dir).arg("status")).await;
    assert_eq!(status["authenticated"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cli_login_failure_exits_nonzero() {
    let dir = temp_dir();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/wallet"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(serde_json::json!({"message": "Wallet not allowed"})),
        )
        .mount(&server)
        .await;

    std::fs::write(
        dir.join("config.yaml"),
        format!("api_base_url: {}/api/\n", server.uri()),
    )
    .expect("write config");

    let (ok, outcome) = run_json(wallet_auth(&dir).args(["login", "--yes"])).await;
    assert!(!ok);
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["error"], "Wallet not allowed");

    let _ = std::fs::remove_dir_all(&dir);
}
