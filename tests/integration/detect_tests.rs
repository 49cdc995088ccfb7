//! Vendor detection over synthetic containers.
//!
//! Detection only inspects directory structure and the embedded XML
//! packet; it never touches tile data. Each rejection case checks the
//! reason string so a misfiled container can be diagnosed from logs.

use wsi_reader::{DetectError, OpenError};

use super::test_utils::*;

fn rejection_reason(result: Result<&'static str, DetectError>) -> String {
    match result {
        Err(DetectError::NotRecognized { reason }) => reason,
        Ok(vendor) => panic!("expected a rejection, got vendor {vendor:?}"),
    }
}

#[tokio::test]
async fn test_detect_standard_slide() {
    assert_eq!(detect(create_standard_slide()).await.unwrap(), "optra");
}

#[tokio::test]
async fn test_detect_minimal_slide() {
    assert_eq!(detect(create_minimal_slide()).await.unwrap(), "optra");
}

#[tokio::test]
async fn test_detect_rejects_untiled_first_directory() {
    let reason = rejection_reason(detect(create_untiled_slide()).await);
    assert!(reason.contains("not tiled"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_detect_rejects_missing_xml_packet() {
    let reason = rejection_reason(detect(create_slide_without_xml()).await);
    assert!(reason.contains("XMLPacket"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_detect_rejects_foreign_xml() {
    let reason = rejection_reason(detect(create_slide_with_foreign_xml()).await);
    assert!(reason.contains("ScanInfo"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_detect_rejects_decoy_root_element() {
    // The marker string appears in an attribute, so the cheap scan
    // passes; the parsed root element gives it away.
    let reason = rejection_reason(detect(create_slide_with_decoy_root()).await);
    assert!(
        reason.contains("root element"),
        "unexpected reason: {reason}"
    );
}

#[tokio::test]
async fn test_detect_rejects_malformed_xml() {
    let reason = rejection_reason(detect(create_slide_with_malformed_xml()).await);
    assert!(reason.contains("parse"), "unexpected reason: {reason}");
}

#[tokio::test]
async fn test_detect_rejects_non_tiff() {
    let reason = rejection_reason(detect(b"GIF89a definitely not a slide".to_vec()).await);
    assert!(
        reason.contains("not a TIFF"),
        "unexpected reason: {reason}"
    );
}

#[tokio::test]
async fn test_detect_does_not_inspect_level_compression() {
    // The LZW level makes the file unopenable, but detection stops at
    // the first directory's structure and metadata.
    assert_eq!(
        detect(create_slide_with_lzw_level()).await.unwrap(),
        "optra"
    );
}

#[tokio::test]
async fn test_detect_and_open_agree() {
    // Recognized containers never come back as format-not-recognized
    // from open, even when opening fails for other reasons.
    let recognized = [
        create_standard_slide(),
        create_minimal_slide(),
        create_pyramid_slide(),
        create_slide_with_lzw_level(),
    ];
    for data in recognized {
        assert!(detect(data.clone()).await.is_ok());
        if let Err(OpenError::FormatNotRecognized) = open_slide(data).await {
            panic!("open rejected a container that detection accepted");
        }
    }

    // Rejected containers consistently fail open the same way.
    let rejected = [
        create_untiled_slide(),
        create_slide_without_xml(),
        create_slide_with_foreign_xml(),
        create_slide_with_decoy_root(),
        create_slide_with_malformed_xml(),
    ];
    for data in rejected {
        assert!(detect(data.clone()).await.is_err());
        assert!(matches!(
            open_slide(data).await,
            Err(OpenError::FormatNotRecognized)
        ));
    }
}
