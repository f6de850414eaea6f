//! A session driven the way an interactive shell drives it.

use crate::common::{drain, ingest_pdfs, page_of};
use pdfcollate::Controller;
use pdfcollate::merge::Merger;
use pdfcollate::preview::PreviewBox;
use pdfcollate::render::OutlineRenderer;
use pdfcollate::session::{Command, Session, SessionEvent};
use std::sync::Arc;

#[tokio::test]
async fn test_edits_queued_behind_a_merge_do_not_change_it() {
    let (session, mut events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(100, 500), (110, 500), (120, 500)])]).await;
    let p1 = page_of(&session, files[0], 1).await;
    let p3 = page_of(&session, files[0], 3).await;
    drain(&mut events);

    let handle = Controller::spawn(session.clone(), Arc::new(Merger::new()));
    handle.send(Command::StartMerge).await.unwrap();
    handle.send(Command::Remove(p1)).await.unwrap();
    handle
        .send(Command::Rotate {
            page_id: p3,
            delta: 90,
        })
        .await
        .unwrap();
    handle.shutdown().await.unwrap();

    let artifact = session.artifacts().latest().await.unwrap();
    assert_eq!(artifact.page_count(), 3);
    assert_eq!(session.page_count().await, 2);
    assert_eq!(session.page(p3).await.unwrap().rotation.degrees(), 90);

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(SessionEvent::MergeStarted { pages: 3 })));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::MergeFinished { pages: 3, .. })
    ));
}

#[tokio::test]
async fn test_commands_from_several_senders() {
    let (session, _events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(100, 500), (110, 500)])]).await;
    let p1 = page_of(&session, files[0], 1).await;
    let p2 = page_of(&session, files[0], 2).await;

    let handle = Controller::spawn(session.clone(), Arc::new(Merger::new()));
    let sender = handle.sender();
    tokio::spawn(async move {
        sender.send(Command::Reorder(vec![p2, p1])).await.unwrap();
    })
    .await
    .unwrap();
    handle.shutdown().await.unwrap();

    assert_eq!(session.page_ids().await, vec![p2, p1]);
}

#[tokio::test]
async fn test_preview_fits_the_box() {
    let (session, _events) = Session::new();
    let files = ingest_pdfs(&session, &[("a.pdf", &[(600, 800)])]).await;
    let p1 = page_of(&session, files[0], 1).await;

    let preview = session
        .preview(Arc::new(OutlineRenderer::new()), p1, PreviewBox::new(300.0, 300.0))
        .await
        .unwrap();

    assert!(preview.width <= 300);
    assert!(preview.height <= 300);
    assert!(preview.height > preview.width);
}
