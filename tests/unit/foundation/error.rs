use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        BitterError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(BitterError::decode("x").to_string().contains("decode error:"));
    assert!(BitterError::encode("x").to_string().contains("encode error:"));
    assert!(
        BitterError::unsupported("x")
            .to_string()
            .contains("unsupported:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BitterError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.code(), ErrorCode::Unknown);
}

#[test]
fn codes_map_to_task_protocol() {
    assert_eq!(BitterError::decode("x").code(), ErrorCode::DecodeFailed);
    assert_eq!(BitterError::encode("x").code(), ErrorCode::EncodeFailed);
    assert_eq!(
        BitterError::unsupported("x").code(),
        ErrorCode::UnsupportedPlatform
    );
    assert_eq!(
        BitterError::Cancelled.code(),
        ErrorCode::VideoProcessCancelled
    );
}

#[test]
fn codes_serialize_screaming_snake() {
    let s = serde_json::to_string(&ErrorCode::VideoProcessCancelled).unwrap();
    assert_eq!(s, "\"VIDEO_PROCESS_CANCELLED\"");
    assert_eq!(ErrorCode::EncodeFailed.to_string(), "ENCODE_FAILED");
}
