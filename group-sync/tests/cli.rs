use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs::write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_file(yaml: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

#[test]
fn sync_with_missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("group-sync").expect("Binary exists");

    cmd.arg("sync").arg("--config").arg("/nonexistent/group-sync.yaml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn sync_with_no_providers_prints_empty_result() {
    let config = config_file("providers: []\n");
    let mut cmd = Command::cargo_bin("group-sync").expect("Binary exists");

    cmd.arg("sync").arg("--config").arg(config.path());

    cmd.assert().success().stdout(predicate::str::contains("[]"));
}

#[test]
fn sync_reports_invalid_provider_and_fails() {
    let config = config_file(
        "providers:\n  - name: corp\n    type: keycloak\n    url: not-a-url\n",
    );
    let mut cmd = Command::cargo_bin("group-sync").expect("Binary exists");

    cmd.arg("sync").arg("--config").arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("corp"))
        .stderr(predicate::str::contains("realm"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_prints_canonical_groups_from_keycloak() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/realms/master/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/corp/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "g1", "name": "eng", "subGroups": [] }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/corp/groups/g1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "u1", "username": "alice" }
        ])))
        .mount(&server)
        .await;

    let secret = config_file("username: admin\npassword: pw\n");
    let config = config_file(&format!(
        "providers:\n  - name: corp\n    type: keycloak\n    url: {}\n    realm: corp\n    credentials:\n      from: file\n      path: {}\n",
        server.uri(),
        secret.path().display()
    ));
    let config_path = config.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("group-sync")
            .expect("Binary exists")
            .arg("sync")
            .arg("--config")
            .arg(config_path)
            .output()
            .expect("binary runs")
    })
    .await
    .expect("command task");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let outcomes: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(outcomes[0]["provider"], "corp");
    assert_eq!(outcomes[0]["groups"][0]["name"], "eng");
    assert_eq!(outcomes[0]["groups"][0]["users"], json!(["alice"]));
    assert_eq!(
        outcomes[0]["groups"][0]["annotations"]["group-sync/source-uid"],
        "g1"
    );
}

/// Collects the debug rendering of every emitted event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use group_sync::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
