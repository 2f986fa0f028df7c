//! Lifecycle of the on-disk runtime cache as seen by the installer.

use std::fs;

use noises_core::domain::{COMPLETION_MARKER, discard_partial, mark_complete};
use noises_core::{CapabilityReport, DriverVersion, InstallationState, VariantTable};
use tempfile::tempdir;

#[test]
fn interrupted_install_is_discarded_then_completed() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("runtime");

    // Acquisition died half way: tree present, no completion marker.
    fs::create_dir_all(cache.join("torch").join("lib")).unwrap();
    let state = InstallationState::read(&cache, "torch");
    assert!(state.is_partial());
    assert!(!state.is_valid());

    assert!(discard_partial(&cache).unwrap());
    assert!(!cache.exists());

    // Second attempt succeeds.
    fs::create_dir_all(cache.join("torch").join("lib")).unwrap();
    let variant = VariantTable::default()
        .resolve(DriverVersion::new(12, 6))
        .unwrap()
        .variant_tag
        .clone();
    mark_complete(&cache, &variant).unwrap();

    let state = InstallationState::read(&cache, "torch");
    assert!(state.is_valid());
    assert_eq!(state.variant_label(), "cu126");
    assert!(cache.join(COMPLETION_MARKER).is_file());
}

#[test]
fn capability_report_serializes_for_diagnostics() {
    let report = CapabilityReport::present("NVIDIA RTX A4000", Some(DriverVersion::new(12, 2)));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["accelerator_present"], true);
    assert_eq!(json["accelerator_name"], "NVIDIA RTX A4000");
    assert_eq!(json["driver_version"]["major"], 12);
    assert_eq!(json["driver_version"]["minor"], 2);

    let absent = serde_json::to_value(CapabilityReport::absent()).unwrap();
    assert_eq!(absent["accelerator_present"], false);
    assert!(absent["driver_version"].is_null());
}
