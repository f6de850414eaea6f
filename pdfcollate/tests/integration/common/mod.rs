//! Shared helpers for the integration tests.
//!
//! Fixtures are built in memory with lopdf, so no PDF files need to be
//! checked in.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use pdfcollate::ingest::{IngestOutcome, Ingestor, Upload};
use pdfcollate::render::OutlineRenderer;
use pdfcollate::session::{EventReceiver, FileId, PageId, Session, SessionEvent};
use std::sync::Arc;

/// Build a PDF with one page per `(width, height)`.
///
/// Resources are inherited from the page tree root and shared by every
/// page, which is what most real-world producers do.
pub fn pdf_with_pages(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![40.into(), 40.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture serializes");
    bytes
}

/// An ingestor with the outline renderer.
pub fn ingestor(session: &Session) -> Ingestor {
    Ingestor::new(session.clone(), Arc::new(OutlineRenderer::new()))
}

/// Ingest PDFs given as `(name, sizes)` and return their file ids in order.
pub async fn ingest_pdfs(session: &Session, files: &[(&str, &[(i64, i64)])]) -> Vec<FileId> {
    let uploads = files
        .iter()
        .map(|(name, sizes)| Upload::pdf(*name, pdf_with_pages(sizes)))
        .collect();

    ingestor(session)
        .ingest_batch(uploads)
        .await
        .iter()
        .map(|outcome| match outcome {
            IngestOutcome::Completed(report) => report.file_id,
            other => panic!("fixture failed to ingest: {other:?}"),
        })
        .collect()
}

/// Id of page `page_number` of `file_id`.
pub async fn page_of(session: &Session, file_id: FileId, page_number: u32) -> PageId {
    session
        .with_pages(|pages| {
            pages
                .pages_for_file(file_id)
                .into_iter()
                .find(|entry| entry.page_number == page_number)
                .map(|entry| entry.id)
        })
        .await
        .unwrap_or_else(|| panic!("page {page_number} of file {file_id} not in collection"))
}

/// Load a merged PDF and return `(width, rotation)` per page, in order.
pub fn page_geometry(bytes: &[u8]) -> Vec<(i64, i64)> {
    let doc = Document::load_mem(bytes).expect("merged PDF loads");
    doc.get_pages()
        .into_values()
        .map(|page_id| geometry(&doc, page_id))
        .collect()
}

fn geometry(doc: &Document, page_id: ObjectId) -> (i64, i64) {
    let page = doc.get_dictionary(page_id).expect("page dictionary");
    let width = page
        .get(b"MediaBox")
        .and_then(Object::as_array)
        .map(|media_box| media_box[2].as_i64().expect("integer width"))
        .expect("page has a media box");
    let rotation = page
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0);
    (width, rotation)
}

/// Every event queued so far.
pub fn drain(events: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
