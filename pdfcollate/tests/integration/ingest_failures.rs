//! Uploads that are skipped or fail, and what they leave behind.

use crate::common::{drain, ingestor, pdf_with_pages};
use pdfcollate::ingest::{IngestOutcome, Upload};
use pdfcollate::merge::Merger;
use pdfcollate::output::IngestSummary;
use pdfcollate::session::{Session, SessionEvent};
use rstest::rstest;

#[rstest]
#[case("notes.txt", "text/plain")]
#[case("scan.png", "image/png")]
#[case("letter.pdf", "application/octet-stream")]
#[tokio::test]
async fn test_non_pdf_uploads_are_ignored_silently(#[case] name: &str, #[case] media_type: &str) {
    let (session, mut events) = Session::new();

    let outcome = ingestor(&session)
        .ingest(Upload::new(name, media_type, pdf_with_pages(&[(100, 100)])))
        .await;

    assert!(matches!(outcome, IngestOutcome::Ignored { .. }));
    assert_eq!(session.page_count().await, 0);
    assert_eq!(session.store().statistics().await.files, 0);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_media_type_parameters_are_accepted() {
    let (session, _events) = Session::new();

    let outcome = ingestor(&session)
        .ingest(Upload::new(
            "a.pdf",
            "Application/PDF; charset=binary",
            pdf_with_pages(&[(100, 100), (100, 100)]),
        ))
        .await;

    assert_eq!(outcome.pages_appended(), 2);
}

#[tokio::test]
async fn test_unparsable_file_is_reported_and_released() {
    let (session, mut events) = Session::new();

    let outcome = ingestor(&session)
        .ingest(Upload::pdf("broken.pdf", b"%PDF-1.4 not really".to_vec()))
        .await;

    let IngestOutcome::Failed { name, error } = outcome else {
        panic!("expected a failed outcome");
    };
    assert_eq!(name, "broken.pdf");
    assert!(error.is_recoverable());
    assert!(error.to_string().contains("broken.pdf"));

    assert_eq!(session.store().statistics().await.files, 0);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [SessionEvent::FileLoadFailed { file, .. }] if file == "broken.pdf"
    ));
}

#[tokio::test]
async fn test_broken_upload_does_not_affect_the_rest_of_the_batch() {
    let (session, _events) = Session::new();

    let outcomes = ingestor(&session)
        .ingest_batch(vec![
            Upload::pdf("a.pdf", pdf_with_pages(&[(100, 100), (110, 100)])),
            Upload::pdf("broken.pdf", b"garbage".to_vec()),
            Upload::new("notes.txt", "text/plain", b"hello".to_vec()),
            Upload::pdf("b.pdf", pdf_with_pages(&[(200, 100)])),
        ])
        .await;

    let summary = IngestSummary::from_outcomes(&outcomes);
    assert_eq!(summary.files_loaded, 2);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_ignored, 1);
    assert_eq!(summary.pages_appended, 3);

    // Outcomes keep upload order even though pages arrive as they render
    assert_eq!(outcomes[0].report().map(|r| r.file_name.as_str()), Some("a.pdf"));
    assert_eq!(outcomes[3].report().map(|r| r.file_name.as_str()), Some("b.pdf"));

    let result = Merger::new().merge(&session).await.unwrap();
    assert_eq!(result.artifact.page_count(), 3);
}

#[tokio::test]
async fn test_labels_use_display_names() {
    let (session, _events) = Session::new();
    ingestor(&session)
        .ingest(Upload::pdf("a.pdf", pdf_with_pages(&[(100, 100), (100, 100)])))
        .await;

    let labels: Vec<String> = session
        .snapshot()
        .await
        .into_iter()
        .map(|entry| entry.label)
        .collect();
    assert_eq!(labels, vec!["File 1 - Page 1", "File 1 - Page 2"]);
}

#[tokio::test]
async fn test_thumbnails_follow_page_orientation() {
    let (session, _events) = Session::new();
    ingestor(&session)
        .with_thumbnail_scale(0.5)
        .ingest(Upload::pdf("a.pdf", pdf_with_pages(&[(200, 400), (400, 200)])))
        .await;

    let pages = session.snapshot().await;
    assert_eq!(pages.len(), 2);

    let portrait = &pages[0].thumbnail;
    let landscape = &pages[1].thumbnail;
    assert!(portrait.height > portrait.width);
    assert!(landscape.width > landscape.height);
    assert!(portrait.data_url().starts_with("data:image/png;base64,"));
}
