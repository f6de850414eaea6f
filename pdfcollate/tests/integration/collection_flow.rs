//! Ingest, edit and merge through the public API.

use crate::common::{drain, ingest_pdfs, page_geometry, page_of};
use pdfcollate::PdfCollateError;
use pdfcollate::merge::Merger;
use pdfcollate::session::{Command, CommandOutcome, Session, SessionEvent};
use rstest::rstest;

#[tokio::test]
async fn test_merge_follows_collection_order() {
    let (session, mut events) = Session::new();
    let files = ingest_pdfs(
        &session,
        &[("a.pdf", &[(100, 500), (110, 500)]), ("b.pdf", &[(200, 500)])],
    )
    .await;
    assert_eq!(session.page_count().await, 3);

    let a2 = page_of(&session, files[0], 2).await;
    let b1 = page_of(&session, files[1], 1).await;
    let a1 = page_of(&session, files[0], 1).await;
    session
        .apply(Command::Reorder(vec![a2, b1, a1]))
        .await
        .unwrap();

    let result = Merger::new().merge(&session).await.unwrap();

    assert_eq!(
        page_geometry(result.artifact.bytes()),
        vec![(110, 0), (200, 0), (100, 0)]
    );
    assert_eq!(result.statistics.pages_merged, 3);
    assert_eq!(result.statistics.files_referenced, 2);

    let events = drain(&mut events);
    let appended = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::PageAppended { .. }))
        .count();
    assert_eq!(appended, 3);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::MergeFinished { pages: 3, .. }
    )));
}

#[tokio::test]
async fn test_remove_and_rotate_before_merge() {
    let (session, _events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(100, 500), (110, 500), (120, 500)])]).await;

    let p1 = page_of(&session, files[0], 1).await;
    let p2 = page_of(&session, files[0], 2).await;
    let p3 = page_of(&session, files[0], 3).await;

    let outcome = session.apply(Command::Remove(p2)).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Removed(true));

    session
        .apply(Command::Rotate {
            page_id: p3,
            delta: -90,
        })
        .await
        .unwrap();
    session
        .apply(Command::Rotate {
            page_id: p1,
            delta: 450,
        })
        .await
        .unwrap();

    let result = Merger::new().merge(&session).await.unwrap();
    assert_eq!(
        page_geometry(result.artifact.bytes()),
        vec![(100, 90), (120, 270)]
    );
}

#[tokio::test]
async fn test_each_file_is_parsed_once_for_merging() {
    let (session, _events) = Session::new();
    ingest_pdfs(
        &session,
        &[("a.pdf", &[(100, 500), (110, 500), (120, 500)]), ("b.pdf", &[(200, 500), (210, 500)])],
    )
    .await;

    let first = Merger::new().merge(&session).await.unwrap();
    assert_eq!(first.statistics.documents_parsed, 2);

    let second = Merger::new().merge(&session).await.unwrap();
    assert_eq!(second.statistics.documents_parsed, 0);

    let stats = session.store().statistics().await;
    assert_eq!(stats.merge_parses, 2);
    assert_eq!(stats.render_parses, 2);
}

#[rstest]
#[case(0)]
#[case(1)]
#[tokio::test]
async fn test_merge_below_two_pages_is_rejected(#[case] kept: usize) {
    let (session, mut events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(100, 500), (110, 500)])]).await;
    for page_number in (kept as u32 + 1)..=2 {
        let page = page_of(&session, files[0], page_number).await;
        session.apply(Command::Remove(page)).await.unwrap();
    }
    let before = session.page_ids().await;
    drain(&mut events);

    let err = Merger::new().merge(&session).await.unwrap_err();
    assert!(matches!(err, PdfCollateError::InsufficientPages { found } if found == kept));
    assert!(session.artifacts().latest().await.is_none());
    assert!(session.trigger().is_ready());
    assert_eq!(session.page_ids().await, before);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [SessionEvent::MergeRejected { .. }]
    ));
}

#[tokio::test]
async fn test_release_after_removing_every_page_of_a_file() {
    let (session, _events) = Session::new();
    let files = ingest_pdfs(
        &session,
        &[("a.pdf", &[(100, 500)]), ("b.pdf", &[(200, 500), (210, 500)])],
    )
    .await;

    let a1 = page_of(&session, files[0], 1).await;
    session.apply(Command::Remove(a1)).await.unwrap();

    assert_eq!(session.release_unused_files().await, vec![files[0]]);
    assert!(session.store().file(files[0]).await.is_err());

    let result = Merger::new().merge(&session).await.unwrap();
    assert_eq!(
        page_geometry(result.artifact.bytes()),
        vec![(200, 0), (210, 0)]
    );
}

#[tokio::test]
async fn test_reorder_from_widget_element_ids() {
    let (session, _events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(100, 500), (110, 500)])]).await;
    let p1 = page_of(&session, files[0], 1).await;
    let p2 = page_of(&session, files[0], 2).await;

    let element_ids = [p2.to_string(), "ghost".to_string(), p1.to_string()];
    let dropped = session.reorder_from_element_ids(&element_ids).await;

    assert_eq!(dropped, 1);
    assert_eq!(session.page_ids().await, vec![p2, p1]);
}
