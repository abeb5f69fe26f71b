use super::*;

#[test]
fn empty_document_yields_defaults() {
    let cfg = PipelineConfig::from_json("{}").unwrap();
    assert_eq!(cfg, PipelineConfig::default());
    assert_eq!(cfg.stream_detection_timeout(), Duration::from_secs(2));
    assert_eq!(cfg.file_detection_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.warp.style, WarpStyle::Droop);
}

#[test]
fn partial_documents_override_only_what_they_name() {
    let cfg = PipelineConfig::from_json(
        r#"{"warp": {"style": 3}, "facing": "back", "encode": {"bitrate": 2000000}}"#,
    )
    .unwrap();
    assert_eq!(cfg.warp.style, WarpStyle::Raise);
    assert_eq!(cfg.warp.intensity, 1.0);
    assert_eq!(cfg.facing, Facing::Back);
    assert_eq!(cfg.encode.bitrate, 2_000_000);
    assert_eq!(cfg.encode.frame_rate, 30);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(PipelineConfig::from_json(r#"{"warp": {"style": 7}}"#).is_err());
    assert!(PipelineConfig::from_json(r#"{"encode": {"frame_rate": 0}}"#).is_err());
    assert!(PipelineConfig::from_json(r#"{"stream_detection_timeout_ms": 0}"#).is_err());
    assert!(PipelineConfig::from_json("[").is_err());
}

#[test]
fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, r#"{"warp": {"intensity": 2.5}}"#).unwrap();
    assert_eq!(PipelineConfig::from_path(&path).unwrap().warp.intensity, 2.5);
    assert!(PipelineConfig::from_path(&dir.path().join("nope.json")).is_err());
}
