use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use railyard_browser::domain::{ItemId, RegistryKind};
use railyard_browser::error::RailyardError;
use railyard_browser::store::Store;

fn temp_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, Store::new_with_root(root))
}

#[test]
fn layout_paths() {
    let store = Store::new(Some("downloads")).unwrap();
    let id: ItemId = "tokyo".parse().unwrap();

    assert_eq!(store.root(), "downloads");
    assert!(
        store
            .item_dir(RegistryKind::Mods, &id)
            .ends_with("mods/tokyo")
    );
    assert!(
        store
            .item_path(RegistryKind::Maps, &id, "https://x.test/dl")
            .ends_with("maps/tokyo/dl")
    );
}

#[test]
fn failed_write_leaves_nothing_behind() {
    let (_dir, store) = temp_store();
    let id: ItemId = "tokyo".parse().unwrap();
    let dest = store.item_path(RegistryKind::Maps, &id, "https://x.test/tokyo.zip");

    let err = Store::write_atomic(&dest, false, |temp| {
        fs::write(temp, b"partial").unwrap();
        Err(RailyardError::DownloadHttp("connection reset".to_string()))
    })
    .unwrap_err();
    assert_matches!(err, RailyardError::DownloadHttp(_));

    assert!(!dest.exists());
    let leftovers = fs::read_dir(store.item_dir(RegistryKind::Maps, &id))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn force_replaces_existing_file() {
    let (_dir, store) = temp_store();
    let id: ItemId = "tokyo".parse().unwrap();
    let dest = store.item_path(RegistryKind::Maps, &id, "https://x.test/tokyo.zip");

    Store::write_atomic(&dest, false, |temp| {
        fs::write(temp, b"v1").map_err(|err| RailyardError::Filesystem(err.to_string()))
    })
    .unwrap();

    let err = Store::write_atomic(&dest, false, |_| Ok(())).unwrap_err();
    assert_matches!(err, RailyardError::DownloadExists(_));
    assert_eq!(fs::read(&dest).unwrap(), b"v1");

    Store::write_atomic(&dest, true, |temp| {
        fs::write(temp, b"v2").map_err(|err| RailyardError::Filesystem(err.to_string()))
    })
    .unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"v2");
}

#[test]
fn failed_forced_write_keeps_existing_file() {
    let (_dir, store) = temp_store();
    let id: ItemId = "tokyo".parse().unwrap();
    let dest = store.item_path(RegistryKind::Maps, &id, "https://x.test/tokyo.zip");

    Store::write_atomic(&dest, false, |temp| {
        fs::write(temp, b"v1").map_err(|err| RailyardError::Filesystem(err.to_string()))
    })
    .unwrap();

    let err = Store::write_atomic(&dest, true, |temp| {
        fs::write(temp, b"v2-partial").unwrap();
        Err(RailyardError::DownloadStatus {
            status: 502,
            message: "bad gateway".to_string(),
        })
    })
    .unwrap_err();
    assert_matches!(err, RailyardError::DownloadStatus { status: 502, .. });
    assert_eq!(fs::read(&dest).unwrap(), b"v1");
    let entries = fs::read_dir(store.item_dir(RegistryKind::Maps, &id))
        .unwrap()
        .count();
    assert_eq!(entries, 1);
}
