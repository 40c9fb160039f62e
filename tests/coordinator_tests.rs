use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use reachout::bridge::{Bridge, BridgeConfig, SettleStrategy, TabChannel};
use reachout::coordinator::{Coordinator, CoordinatorHandle, InstallReason};
use reachout::extractor::{ExtractorConfig, ProfileExtractor};
use reachout::host::InProcessHost;
use reachout::providers::MockGenerator;
use reachout::storage::{InMemorySettingsStore, JsonFileSettingsStore, SettingsStore};
use reachout::types::{Statistics, TabId};

const PROFILE_URL: &str = "https://www.linkedin.com/in/ada-lovelace";
const PROFILE_HTML: &str = r#"
<main>
  <h1 class="text-heading-xlarge">Ada Lovelace</h1>
  <div class="text-body-medium break-words">Software Engineer at Analytical Engines</div>
</main>"#;

fn create_test_store() -> Arc<InMemorySettingsStore> {
    Arc::new(InMemorySettingsStore::with_document(
        json!({"userContext": "CS grad", "userRole": "developer"})
            .as_object()
            .cloned()
            .unwrap(),
    ))
}

fn create_test_setup(store: Arc<InMemorySettingsStore>) -> (CoordinatorHandle, InProcessHost, TabId) {
    let extractor = Arc::new(ProfileExtractor::new(&ExtractorConfig::default()).unwrap());
    let host = InProcessHost::new(extractor, store.clone())
        .with_agent_init_delay(Duration::from_millis(5));
    let tab = host.open_tab(PROFILE_URL, PROFILE_HTML);

    let channel: Arc<dyn TabChannel> = Arc::new(host.clone());
    let bridge = Arc::new(Bridge::new(
        channel,
        BridgeConfig {
            probe_timeout: Duration::from_millis(100),
            settle: SettleStrategy::Handshake {
                initial: Duration::from_millis(10),
                max_wait: Duration::from_millis(500),
            },
            ..Default::default()
        },
    ));

    let coordinator =
        Coordinator::new(store, Arc::new(MockGenerator::new())).with_relay(bridge);
    let (handle, _task) = coordinator.spawn(16);
    (handle, host, tab)
}

fn every_action() -> Vec<Value> {
    vec![
        json!({"action": "ping"}),
        json!({"action": "getProfileData"}),
        json!({"action": "generateGeminiMessage", "profileData": {"name": "Ada", "headline": "Engineer"}}),
        json!({"action": "settingsUpdated", "settings": {"userContext": "CS grad", "userRole": "developer"}}),
        json!({"action": "showGenerateButton"}),
        json!({"action": "getSettings", "keys": ["userRole"]}),
        json!({"action": "saveSettings", "data": {"userRole": "engineer"}}),
        json!({"action": "logActivity", "activity": "popup_opened"}),
    ]
}

#[tokio::test]
async fn test_every_action_gets_one_response_with_success() {
    let (handle, _host, tab) = create_test_setup(create_test_store());

    for message in every_action() {
        let response = handle.handle_wire(message.clone(), Some(tab)).await;
        assert!(
            response["success"].is_boolean(),
            "no success flag for {}: {}",
            message,
            response
        );
        assert_eq!(response["success"], true, "{} failed: {}", message, response);
    }
}

#[tokio::test]
async fn test_unrecognized_actions_are_answered() {
    let (handle, _host, tab) = create_test_setup(create_test_store());

    for message in [
        json!({"action": "deleteEverything"}),
        json!({"action": 42}),
        json!({"noAction": true}),
        json!("ping"),
    ] {
        let response = handle.handle_wire(message, Some(tab)).await;
        assert_eq!(response, json!({"success": false, "error": "Unknown action"}));
    }
}

#[tokio::test]
async fn test_profile_relay_installs_agent_once() {
    let (handle, host, tab) = create_test_setup(create_test_store());

    let first = handle
        .handle_wire(json!({"action": "getProfileData"}), Some(tab))
        .await;
    assert_eq!(first["success"], true);
    assert_eq!(first["profileData"]["name"], "Ada Lovelace");
    assert_eq!(first["profileData"]["company"], "Analytical Engines");
    assert_eq!(first["profileData"]["industry"], "technology");

    let second = handle
        .handle_wire(json!({"action": "getProfileData"}), Some(tab))
        .await;
    assert_eq!(second, first);
    assert_eq!(host.install_count(), 1);
}

#[tokio::test]
async fn test_profile_relay_off_profile_page() {
    let (handle, host, _tab) = create_test_setup(create_test_store());
    let feed = host.open_tab("https://www.linkedin.com/feed/", "<main>feed</main>");

    let response = handle
        .handle_wire(json!({"action": "getProfileData"}), Some(feed))
        .await;
    assert_eq!(response, json!({"success": false, "error": "Not a profile page"}));
}

#[tokio::test]
async fn test_generate_counts_messages() {
    let store = create_test_store();
    let (handle, _host, _tab) = create_test_setup(store.clone());

    for _ in 0..3 {
        let response = handle
            .handle_wire(
                json!({"action": "generateGeminiMessage", "profileData": {"name": "Ada Lovelace"}}),
                None,
            )
            .await;
        assert!(response["message"].as_str().unwrap().starts_with("Hi Ada,"));
    }

    let stats = Statistics::from_document(&store.load().await.unwrap());
    assert_eq!(stats.messages_generated, 3);
}

#[tokio::test]
async fn test_generate_without_context_is_refused() {
    let store = Arc::new(InMemorySettingsStore::new());
    let (handle, _host, _tab) = create_test_setup(store);

    let response = handle
        .handle_wire(
            json!({"action": "generateGeminiMessage", "profileData": {"name": "Ada"}}),
            None,
        )
        .await;
    assert_eq!(response["success"], false);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing configuration"));
}

#[tokio::test]
async fn test_update_migration_on_disk_is_additive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"userContext": "CS grad", "userRole": "developer", "theme": {"dark": true}}"#,
    )
    .unwrap();

    let store = Arc::new(JsonFileSettingsStore::new(&path));
    let coordinator = Coordinator::new(store.clone(), Arc::new(MockGenerator::new()));
    coordinator
        .on_installed(InstallReason::Update {
            previous_version: "0.9.0".to_string(),
        })
        .await
        .unwrap();

    let document: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document["userContext"], "CS grad");
    assert_eq!(document["userRole"], "developer");
    assert_eq!(document["theme"], json!({"dark": true}));
    assert_eq!(document["statistics"]["messagesGenerated"], 0);
    assert_eq!(document["settings"]["messageLength"], "medium");
}
