//! Tests to verify that all public types are Send + Sync as required.

use scriptvol::*;

const fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_path_types_are_send_sync() {
    assert_send_sync::<VolumePath>();
    assert_send_sync::<GlobalPath>();
    assert_send_sync::<VolumeId>();
}

#[test]
fn test_volume_types_are_send_sync() {
    assert_send_sync::<Volume>();
    assert_send_sync::<Archive>();
    assert_send_sync::<Harddisk>();
    assert_send_sync::<VolumeItem>();
    assert_send_sync::<VolumeFile>();
    assert_send_sync::<VolumeDirectory>();
    assert_send_sync::<FileContent>();
}

#[test]
fn test_registry_types_are_send_sync() {
    assert_send_sync::<VolumeManager>();
    assert_send_sync::<MountedStorage>();
    assert_send_sync::<StorageConfig>();
    assert_send_sync::<HarddiskImage>();
}

#[test]
fn test_error_is_send_sync() {
    assert_send_sync::<VolumeError>();
}
