//! Integration tests for backup, restore and rename.

use dmt_abstraction::{ArtifactLayout, MemoryLogSink, MemorySettings, SettingKey, SettingsStore};
use dmt_store::{
    FailureCause, HttpRemoteStore, InMemoryRemote, ModelVersionStore, RemoteStore, StoreAction,
    StoreError, StoreEvent,
};
use mockito::Matcher;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    temp: TempDir,
    settings: Arc<MemorySettings>,
    log: Arc<MemoryLogSink>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            settings: Arc::new(MemorySettings::new()),
            log: Arc::new(MemoryLogSink::new()),
        }
    }

    /// Store whose baseline is a single JSON file.
    fn store(&self, remote: Arc<dyn RemoteStore>) -> ModelVersionStore {
        let baseline = self.temp.path().join("housing.json");
        std::fs::write(&baseline, b"{\"weights\":[0.0,0.0],\"bias\":22.5}").unwrap();
        self.open(baseline, remote)
    }

    /// Store whose baseline is a directory bundle.
    fn bundle_store(&self, remote: Arc<dyn RemoteStore>) -> ModelVersionStore {
        let baseline = self.temp.path().join("housing.mlmodelc");
        std::fs::create_dir_all(baseline.join("weights")).unwrap();
        std::fs::write(baseline.join("weights/dense.bin"), [3u8; 32]).unwrap();
        std::fs::write(baseline.join("model.spec"), b"spec").unwrap();
        self.open(baseline, remote)
    }

    fn open(&self, baseline: std::path::PathBuf, remote: Arc<dyn RemoteStore>) -> ModelVersionStore {
        let layout = ArtifactLayout::for_data_dir(&self.temp.path().join("data"), baseline);
        let store = ModelVersionStore::new(layout, self.settings.clone(), remote, self.log.clone()).unwrap();
        store.install_default_if_absent().unwrap();
        store
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_backup_then_restore_is_byte_identical() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.store(remote.clone());
    let canonical = store.layout().updatable_path();
    let original = std::fs::read(&canonical).unwrap();

    store.backup().await.unwrap();
    assert!(remote.contains(&store.model_id()));

    std::fs::write(&canonical, b"{\"weights\":[9.0,9.0],\"bias\":1.0}").unwrap();
    store.restore(&store.model_id()).await.unwrap();

    assert_eq!(std::fs::read(&canonical).unwrap(), original);
    assert!(fx.log.lines().contains(&"Model was restored from the cloud".to_string()));

    // Only the canonical artifact remains; no temp archive or staging dir.
    let entries: Vec<_> = std::fs::read_dir(store.layout().root()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_directory_artifact_roundtrip() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.bundle_store(remote);
    let canonical = store.layout().updatable_path();

    store.backup().await.unwrap();
    std::fs::write(canonical.join("weights/dense.bin"), [0u8; 4]).unwrap();
    std::fs::write(canonical.join("stray.tmp"), b"x").unwrap();

    store.restore(&store.model_id()).await.unwrap();

    assert_eq!(std::fs::read(canonical.join("weights/dense.bin")).unwrap(), [3u8; 32]);
    assert_eq!(std::fs::read(canonical.join("model.spec")).unwrap(), b"spec");
    assert!(!canonical.join("stray.tmp").exists());
}

#[tokio::test]
async fn test_restore_unknown_id_is_not_found() {
    let fx = Fixture::new();
    let store = fx.store(Arc::new(InMemoryRemote::new("secret")));
    let before = std::fs::read(store.layout().updatable_path()).unwrap();

    let err = store.restore("nobody").await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound));
    assert_eq!(std::fs::read(store.layout().updatable_path()).unwrap(), before);
    assert!(!store.is_busy());
}

#[tokio::test]
async fn test_rename_conflict_leaves_both_backups() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.store(remote.clone());
    let old_id = store.model_id();

    store.backup().await.unwrap();
    remote.insert("taken", b"someone else".to_vec());
    let old_blob = remote.blob(&old_id);

    let err = store.rename("taken").await.unwrap_err();

    assert!(matches!(err, StoreError::RenameConflict));
    assert_eq!(remote.blob(&old_id), old_blob);
    assert_eq!(remote.blob("taken"), Some(b"someone else".to_vec()));
    assert_eq!(store.model_id(), old_id);
    assert_eq!(fx.settings.get(SettingKey::ModelId), Some(old_id));
}

#[tokio::test]
async fn test_rename_without_backup_uploads_first() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.store(remote.clone());
    let old_id = store.model_id();
    let local = store.package_artifact().unwrap();

    store.rename("kitchen-tablet").await.unwrap();

    assert!(!remote.contains(&old_id));
    assert_eq!(remote.blob("kitchen-tablet"), Some(local));
    assert_eq!(store.model_id(), "kitchen-tablet");
    assert_eq!(fx.settings.get(SettingKey::ModelId).as_deref(), Some("kitchen-tablet"));
    // rename (404), destination check (404), backup, rename (200)
    assert_eq!(remote.requests(), 4);
}

#[tokio::test]
async fn test_rename_onto_taken_id_without_backup_uploads_nothing() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.store(remote.clone());
    let old_id = store.model_id();
    remote.insert("taken", b"someone else".to_vec());

    let err = store.rename("taken").await.unwrap_err();

    assert!(matches!(err, StoreError::RenameConflict));
    assert!(!remote.contains(&old_id));
    assert_eq!(remote.blob("taken"), Some(b"someone else".to_vec()));
    assert_eq!(store.model_id(), old_id);
    // rename (404), destination check (200)
    assert_eq!(remote.requests(), 2);
}

#[tokio::test]
async fn test_invalid_new_id_sends_nothing() {
    let fx = Fixture::new();
    let remote = Arc::new(InMemoryRemote::new("secret"));
    let store = fx.store(remote.clone());

    let current = store.model_id();
    assert!(matches!(store.rename("  ").await, Err(StoreError::InvalidModelId(_))));
    assert!(matches!(store.rename(&current).await, Err(StoreError::InvalidModelId(_))));
    assert!(matches!(store.restore("").await, Err(StoreError::InvalidModelId(_))));
    assert_eq!(remote.requests(), 0);
}

#[tokio::test]
async fn test_wrong_api_key_fails_backup() {
    let fx = Fixture::new();
    let store = fx.store(Arc::new(InMemoryRemote::with_keys("secret", "stale")));

    let err = store.backup().await.unwrap_err();
    assert!(matches!(err, StoreError::BackupFailed(FailureCause::Status(401))));
}

#[tokio::test]
async fn test_events_bracket_each_action() {
    let fx = Fixture::new();
    let store = fx.store(Arc::new(InMemoryRemote::new("secret")));
    let mut rx = store.subscribe();

    store.backup().await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![
            StoreEvent::ActivityChanged { busy: true },
            StoreEvent::Completed { action: StoreAction::Backup },
            StoreEvent::ActivityChanged { busy: false },
        ]
    );

    store.restore("missing").await.unwrap_err();
    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[1], StoreEvent::Failed { action: StoreAction::Restore, .. }));
}

// HTTP status mapping

fn http_store(fx: &Fixture, server: &mockito::Server) -> ModelVersionStore {
    let remote = HttpRemoteStore::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
    fx.store(Arc::new(remote))
}

#[tokio::test]
async fn test_http_backup_storage_failure() {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/backupModel").match_query(Matcher::Any).with_status(400).create_async().await;
    let fx = Fixture::new();
    let store = http_store(&fx, &server);

    let err = store.backup().await.unwrap_err();
    assert!(matches!(err, StoreError::BackupFailed(FailureCause::Status(400))));
}

#[tokio::test]
async fn test_http_restore_statuses() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/restoreModel")
        .match_query(Matcher::UrlEncoded("modelId".into(), "empty".into()))
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("GET", "/restoreModel")
        .match_query(Matcher::UrlEncoded("modelId".into(), "broken".into()))
        .with_status(500)
        .create_async()
        .await;
    let fx = Fixture::new();
    let store = http_store(&fx, &server);

    assert!(matches!(
        store.restore("empty").await,
        Err(StoreError::RestoreFailed(FailureCause::EmptyBody))
    ));
    assert!(matches!(
        store.restore("broken").await,
        Err(StoreError::RestoreFailed(FailureCause::Status(500)))
    ));
}

#[tokio::test]
async fn test_http_rename_retries_once_after_backup() {
    let mut server = mockito::Server::new_async().await;
    let rename = server
        .mock("PUT", "/changeModelId")
        .match_query(Matcher::UrlEncoded("newId".into(), "renamed".into()))
        .with_status(404)
        .expect(2)
        .create_async()
        .await;
    let destination = server
        .mock("GET", "/restoreModel")
        .match_query(Matcher::UrlEncoded("modelId".into(), "renamed".into()))
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let backup = server
        .mock("POST", "/backupModel")
        .match_query(Matcher::Any)
        .with_status(201)
        .expect(1)
        .create_async()
        .await;
    let fx = Fixture::new();
    let store = http_store(&fx, &server);
    let old_id = store.model_id();

    let err = store.rename("renamed").await.unwrap_err();

    assert!(matches!(err, StoreError::RenameFailed(FailureCause::Status(404))));
    assert_eq!(store.model_id(), old_id);
    rename.assert_async().await;
    destination.assert_async().await;
    backup.assert_async().await;
}

#[tokio::test]
async fn test_http_rename_source_missing_destination_taken_is_conflict() {
    let mut server = mockito::Server::new_async().await;
    let rename = server
        .mock("PUT", "/changeModelId")
        .match_query(Matcher::Any)
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let destination = server
        .mock("GET", "/restoreModel")
        .match_query(Matcher::UrlEncoded("modelId".into(), "taken".into()))
        .with_status(200)
        .with_body("someone else")
        .expect(1)
        .create_async()
        .await;
    let backup = server
        .mock("POST", "/backupModel")
        .match_query(Matcher::Any)
        .with_status(201)
        .expect(0)
        .create_async()
        .await;
    let fx = Fixture::new();
    let store = http_store(&fx, &server);

    let err = store.rename("taken").await.unwrap_err();

    assert!(matches!(err, StoreError::RenameConflict));
    rename.assert_async().await;
    destination.assert_async().await;
    backup.assert_async().await;
}

#[tokio::test]
async fn test_http_unreachable_is_transport_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let fx = Fixture::new();
    let remote = HttpRemoteStore::new(&format!("http://{addr}"), "secret", Duration::from_secs(2)).unwrap();
    let store = fx.store(Arc::new(remote));

    let err = store.backup().await.unwrap_err();
    assert!(matches!(err, StoreError::BackupFailed(FailureCause::Transport(_))));
}

// Busy guard and cancellation

/// Accepts connections but never answers.
async fn silent_server() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn test_second_action_is_rejected_while_busy() {
    let (_listener, url) = silent_server().await;
    let fx = Fixture::new();
    let remote = HttpRemoteStore::new(&url, "secret", Duration::from_secs(30)).unwrap();
    let store = fx.store(Arc::new(remote));

    let (first, second) = tokio::join!(
        tokio::time::timeout(Duration::from_millis(300), store.backup()),
        async {
            tokio::task::yield_now().await;
            store.restore("other").await
        }
    );

    assert!(first.is_err(), "first backup should still be pending");
    assert!(matches!(second, Err(StoreError::OperationInProgress)));
}

#[tokio::test]
async fn test_dropping_action_releases_busy_flag() {
    let (listener, url) = silent_server().await;
    let fx = Fixture::new();
    let remote = HttpRemoteStore::new(&url, "secret", Duration::from_secs(30)).unwrap();
    let store = fx.store(Arc::new(remote));
    let mut rx = store.subscribe();

    let timed_out = tokio::time::timeout(Duration::from_millis(200), store.backup()).await;
    assert!(timed_out.is_err());

    assert!(!store.is_busy());
    assert_eq!(
        drain(&mut rx),
        vec![StoreEvent::ActivityChanged { busy: true }, StoreEvent::ActivityChanged { busy: false }]
    );

    // A new action is accepted again (and fails fast on the now-closed socket).
    drop(listener);
    let err = store.restore("abc").await.unwrap_err();
    assert!(!matches!(err, StoreError::OperationInProgress));
}

#[test]
fn test_package_requires_artifact() {
    let fx = Fixture::new();
    let store = fx.store(Arc::new(InMemoryRemote::new("secret")));
    store.remove_updatable().unwrap();
    assert!(matches!(store.package_artifact(), Err(StoreError::MissingArtifact(_))));
    assert!(!Path::new(&store.layout().updatable_path()).exists());
}
