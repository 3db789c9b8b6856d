use std::fs;

use integration_sync::models::{Binding, BindingState};
use integration_sync::store::{BindingStore, BindingStoreError, MemoryBindingStore, ShellEnvBindingStore};
use tempfile::TempDir;
mod test_utils;
use test_utils::{DEFAULT_EXTERNAL_ID, ROLE_ARN, target};

fn store_in(dir: &TempDir) -> ShellEnvBindingStore {
    ShellEnvBindingStore::new(dir.path().join("env_vars.sh"))
}

#[tokio::test]
async fn missing_file_means_no_binding() {
    let dir = TempDir::new().unwrap();
    assert_eq!(store_in(&dir).load().await.unwrap(), None);
}

#[tokio::test]
async fn saved_binding_is_loaded_back() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let binding = Binding::new("int-1", "ext-abc", &target(), BindingState::Synced);

    store.save(&binding).await.unwrap();
    let loaded = store.load().await.unwrap().unwrap();

    assert_eq!(loaded.integration_id, "int-1");
    assert_eq!(loaded.current_external_id, "ext-abc");
    assert_eq!(loaded.role_arn, ROLE_ARN);
    assert_eq!(loaded.default_external_id, DEFAULT_EXTERNAL_ID);
    assert_eq!(loaded.state, BindingState::Synced);
    assert!(loaded.updated_at.is_some());
}

#[tokio::test]
async fn file_is_shell_sourceable_and_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let binding = Binding::new("int-1", "ext-abc", &target(), BindingState::RotationPending);

    store.save(&binding).await.unwrap();

    let contents = fs::read_to_string(dir.path().join("env_vars.sh")).unwrap();
    assert!(contents.contains("export INTEGRATION_ID='int-1'\n"));
    assert!(contents.contains("export EXTERNAL_ID='ext-abc'\n"));
    assert!(contents.contains("export BINDING_STATE='rotation_pending'\n"));
    assert!(!dir.path().join("env_vars.sh.tmp").exists());
}

#[tokio::test]
async fn legacy_two_line_file_reads_as_synced() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("env_vars.sh"),
        "export EXTERNAL_ID=ext-abc\nexport INTEGRATION_ID=int-1\n",
    )
    .unwrap();

    let loaded = store_in(&dir).load().await.unwrap().unwrap();
    assert_eq!(loaded.state, BindingState::Synced);
    assert_eq!(loaded.integration_id, "int-1");
    assert_eq!(loaded.role_arn, "");
    assert_eq!(loaded.updated_at, None);
}

#[tokio::test]
async fn file_without_integration_id_is_incomplete() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("env_vars.sh"), "export EXTERNAL_ID=ext-abc\n").unwrap();

    let err = store_in(&dir).load().await.unwrap_err();
    assert!(matches!(
        err,
        BindingStoreError::Incomplete {
            key: "INTEGRATION_ID",
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_state_is_invalid() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("env_vars.sh"),
        "export INTEGRATION_ID=int-1\nexport EXTERNAL_ID=ext-abc\nexport BINDING_STATE=limbo\n",
    )
    .unwrap();

    let err = store_in(&dir).load().await.unwrap_err();
    assert!(matches!(
        err,
        BindingStoreError::InvalidValue {
            key: "BINDING_STATE",
            ..
        }
    ));
}

#[tokio::test]
async fn unsafe_values_never_reach_disk() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let binding = Binding::new("int-1", "ext'; rm -rf ~", &target(), BindingState::Synced);

    let err = store.save(&binding).await.unwrap_err();
    assert!(matches!(
        err,
        BindingStoreError::UnsafeValue {
            key: "EXTERNAL_ID",
            ..
        }
    ));
    assert!(!dir.path().join("env_vars.sh").exists());
}

#[tokio::test]
async fn save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = ShellEnvBindingStore::new(dir.path().join("state/nested/binding.sh"));
    let binding = Binding::new("int-1", "ext-abc", &target(), BindingState::Provisioned);

    store.save(&binding).await.unwrap();
    assert_eq!(
        store.load().await.unwrap().unwrap().state,
        BindingState::Provisioned
    );
    assert!(store.location().ends_with("binding.sh"));
}

#[tokio::test]
async fn memory_store_records_state_history() {
    let store = MemoryBindingStore::new();
    let mut binding = Binding::new("int-1", "ext-abc", &target(), BindingState::Provisioned);

    store.save(&binding).await.unwrap();
    binding.transition(BindingState::Synced);
    store.save(&binding).await.unwrap();

    assert_eq!(
        store.saved_states().await,
        vec![BindingState::Provisioned, BindingState::Synced]
    );
    assert_eq!(store.snapshot().await.unwrap().state, BindingState::Synced);
}
