//! Published artifacts: download URLs, revocation and writing to disk.

use crate::common::{ingest_pdfs, page_geometry};
use pdfcollate::PdfCollateError;
use pdfcollate::artifact::WriteOptions;
use pdfcollate::config::{CompressionLevel, Metadata};
use pdfcollate::merge::{MergeOptions, Merger};
use pdfcollate::session::Session;

async fn merged_session() -> Session {
    let (session, _events) = Session::new();
    ingest_pdfs(
        &session,
        &[("a.pdf", &[(100, 500)]), ("b.pdf", &[(200, 500)])],
    )
    .await;
    session
}

#[tokio::test]
async fn test_new_merge_revokes_previous_url() {
    let session = merged_session().await;
    let merger = Merger::new();

    let first = merger.merge(&session).await.unwrap().artifact;
    assert!(session.artifacts().resolve(first.url()).await.is_ok());

    let second = merger.merge(&session).await.unwrap().artifact;
    assert_ne!(first.url(), second.url());

    let err = session.artifacts().resolve(first.url()).await.unwrap_err();
    assert!(matches!(err, PdfCollateError::ArtifactNotFound { .. }));
    assert_eq!(session.artifacts().len().await, 1);

    // Holders of the old artifact keep its bytes
    assert_eq!(page_geometry(first.bytes()).len(), 2);
}

#[tokio::test]
async fn test_revoke_url() {
    let session = merged_session().await;
    let artifact = Merger::new().merge(&session).await.unwrap().artifact;

    assert!(session.artifacts().revoke(artifact.url()).await);
    assert!(!session.artifacts().revoke(artifact.url()).await);
    assert!(session.artifacts().latest().await.is_none());
    assert!(session.artifacts().is_empty().await);
}

#[tokio::test]
async fn test_write_respects_overwrite_option() {
    let session = merged_session().await;
    let artifact = Merger::new().merge(&session).await.unwrap().artifact;
    assert_eq!(artifact.mime_type(), "application/pdf");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merged.pdf");

    let stats = artifact
        .write_to(&path, &WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.file_size, artifact.size());
    assert_eq!(tokio::fs::read(&path).await.unwrap(), artifact.bytes());

    let err = artifact
        .write_to(&path, &WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PdfCollateError::OutputExists { .. }));

    assert!(
        artifact
            .write_to(&path, &WriteOptions::overwriting())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_metadata_and_compression_options() {
    let session = merged_session().await;
    let merger = Merger::with_options(MergeOptions {
        compression: CompressionLevel::Maximum,
        metadata: Metadata::new(Some("Handouts".to_string()), None, None, None),
    });

    let artifact = merger.merge(&session).await.unwrap().artifact;

    let doc = lopdf::Document::load_mem(artifact.bytes()).unwrap();
    let info_id = doc
        .trailer
        .get(b"Info")
        .and_then(lopdf::Object::as_reference)
        .unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert_eq!(
        info.get(b"Title").and_then(lopdf::Object::as_str).unwrap(),
        b"Handouts"
    );
    assert_eq!(
        info.get(b"Producer").and_then(lopdf::Object::as_str).unwrap(),
        b"pdfcollate"
    );
}
