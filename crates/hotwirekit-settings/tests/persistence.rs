use hotwirekit_settings::{
    Config, FeedMode, FoamProfile, ProfileLibrary, SettingsError, TableProfile,
};

#[test]
fn test_profile_library_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles").join("hotwire_config.json");

    let mut lib = ProfileLibrary::default();
    lib.add_foam(FoamProfile {
        name: "EPS 20".to_string(),
        root_kerf: 1.2,
        speed: 5.0,
        tip_kerf: 1.5,
        heat: 60.0,
    })
    .unwrap();
    lib.add_table(TableProfile {
        name: "Large".to_string(),
        wire_length: 1000.0,
        ..TableProfile::default()
    })
    .unwrap();
    lib.save(&path).unwrap();

    let loaded = ProfileLibrary::load(&path).unwrap();
    assert_eq!(loaded, lib);
    assert_eq!(loaded.foam(1).unwrap().name, "EPS 20");
    assert_eq!(loaded.table(1).unwrap().wire_length, 1000.0);
}

#[test]
fn test_missing_profile_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let lib = ProfileLibrary::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(lib, ProfileLibrary::default());
}

#[test]
fn test_config_round_trip_toml_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.foam_index = 1;
    config.machine.feed_mode = FeedMode::Constant;
    config.machine.virtual_zero = [10.0, 5.0, 0.0];
    config.cut_block.clearance = 15.0;

    for name in ["config.toml", "config.json"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let err = Config::default().save_to_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::UnsupportedFormat(_)));
}
