//! Profile persistence against file-backed storage.
//!
//! The on-target blob lives in a flash page; these tests stand in a file
//! for the page and check that the table survives a "reboot" (a fresh
//! manager over the same storage) and that corruption falls back cleanly.

use std::fs;
use std::path::PathBuf;

use rig_control_unit::profile::storage::ProfileStorage;
use rig_control_unit::profile::{ProfileManager, blob};

/// File-backed storage double standing in for the profile flash page.
struct FileStorage {
    path: PathBuf,
}

impl ProfileStorage for FileStorage {
    fn read(&mut self, buf: &mut [u8]) -> bool {
        match fs::read(&self.path) {
            Ok(data) if data.len() >= buf.len() => {
                buf.copy_from_slice(&data[..buf.len()]);
                true
            }
            _ => false,
        }
    }

    fn write(&mut self, data: &[u8]) -> bool {
        fs::write(&self.path, data).is_ok()
    }
}

fn storage_in(dir: &tempfile::TempDir) -> FileStorage {
    FileStorage {
        path: dir.path().join("profiles.bin"),
    }
}

#[test]
fn fresh_storage_boots_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ProfileManager::new(storage_in(&dir));
    assert!(!manager.storage_loaded());
    assert_eq!(manager.active_car_type(), 0);
    assert_eq!(manager.active_params().force_intensity, 1.0);
}

#[test]
fn saved_profiles_survive_reboot() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = ProfileManager::new(storage_in(&dir));
    assert!(first.set_tuning(1, 0.66, 0.75));
    assert!(first.set_tuning(5, 0.33, 0.45));
    assert!(first.switch_active(5));
    assert!(first.save(1));
    assert!(first.save(5));

    let second = ProfileManager::new(storage_in(&dir));
    assert!(second.storage_loaded());
    assert_eq!(second.active_car_type(), 5);
    let params = second.active_params();
    assert_eq!(params.force_intensity, 0.33);
    assert_eq!(params.motion_range, 0.45);
    let params = second.get_params(1).unwrap();
    assert_eq!(params.force_intensity, 0.66);
    assert_eq!(params.motion_range, 0.75);
}

#[test]
fn corrupted_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = ProfileManager::new(storage_in(&dir));
    assert!(first.set_tuning(2, 0.5, 0.5));
    assert!(first.switch_active(2));
    assert!(first.save(2));

    let path = dir.path().join("profiles.bin");
    let mut bytes = fs::read(&path).unwrap();
    bytes[9] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let second = ProfileManager::new(storage_in(&dir));
    assert!(!second.storage_loaded());
    assert_eq!(second.active_car_type(), 0);
    assert_eq!(second.active_params().force_intensity, 1.0);
}

#[test]
fn truncated_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = ProfileManager::new(storage_in(&dir));
    assert!(first.save(0));

    let path = dir.path().join("profiles.bin");
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), blob::BLOB_LEN);
    fs::write(&path, &bytes[..blob::BLOB_LEN / 2]).unwrap();

    let second = ProfileManager::new(storage_in(&dir));
    assert!(!second.storage_loaded());
}
