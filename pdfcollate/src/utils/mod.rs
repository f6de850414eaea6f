//! Utilities for path collection, page geometry lookups, etc.

use crate::{Result, error::PdfCollateError, session::Rotation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serializer;
use std::path::PathBuf;
use std::time::Duration;

/// US Letter in points, used when a page carries no usable box.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Page tree depth after which inherited lookups give up.
const MAX_TREE_DEPTH: usize = 64;

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`.
///
/// A pattern without glob metacharacters is passed through unchanged even
/// if nothing exists at that path, so the caller reports the missing file.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let pattern = pattern.as_ref();
        if !pattern.contains(['*', '?', '[']) {
            resolved_paths.push(PathBuf::from(pattern));
            continue;
        }
        resolved_paths.extend(collect_paths_for_pattern(pattern)?);
    }

    Ok(resolved_paths)
}

/// Expand a single glob pattern into filesystem paths.
fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut resolved_paths = Vec::new();

    let paths = glob::glob(pattern).map_err(|err| {
        PdfCollateError::invalid_config(format!("Invalid glob pattern '{pattern}': {err}"))
    })?;

    for entry in paths {
        let path = entry.map_err(|err| PdfCollateError::other(err.to_string()))?;
        resolved_paths.push(path);
    }

    resolved_paths.sort();
    Ok(resolved_paths)
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
///
/// References are resolved, so the returned object is the value itself.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current: &Dictionary = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// Width and height of a page in points, from its crop box or media box.
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .find_map(|key| {
            inherited_attribute(doc, page_id, key).and_then(|value| rect_size(doc, &value))
        })
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// The page's own `/Rotate`, normalized. Invalid values count as no rotation.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|value| value.as_i64().ok())
        .and_then(|degrees| i32::try_from(degrees).ok())
        .and_then(|degrees| Rotation::from_degrees(degrees).ok())
        .unwrap_or_default()
}

fn resolve<'a>(doc: &'a Document, value: &'a Object) -> &'a Object {
    match value {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(value),
        _ => value,
    }
}

fn rect_size(doc: &Document, value: &Object) -> Option<(f32, f32)> {
    let coords = value.as_array().ok()?;
    if coords.len() != 4 {
        return None;
    }

    let mut numbers = [0.0f32; 4];
    for (slot, coord) in numbers.iter_mut().zip(coords) {
        *slot = resolve(doc, coord).as_float().ok()?;
    }

    let width = (numbers[2] - numbers[0]).abs();
    let height = (numbers[3] - numbers[1]).abs();
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Run blocking collaborator work (parsing, rendering, saving) off the async runtime.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PdfCollateError::other(format!("Blocking task failed: {e}")))?
}

/// Serialize a duration as whole milliseconds.
pub(crate) fn serialize_millis<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PageSpec, build_document};
    use lopdf::dictionary;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 bytes");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_literal_paths_pass_through() {
        let paths = collect_paths_for_patterns(["missing.pdf", "dir/other.pdf"]).unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("missing.pdf"), PathBuf::from("dir/other.pdf")]
        );
    }

    #[test]
    fn test_glob_expansion_is_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.pdf", "a.pdf", "c.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pattern = format!("{}/*.pdf", dir.path().display());
        let paths = collect_paths_for_patterns([pattern]).unwrap();
        assert_eq!(paths, vec![dir.path().join("a.pdf"), dir.path().join("b.pdf")]);
    }

    #[test]
    fn test_invalid_glob() {
        assert!(collect_paths_for_patterns(["[*.pdf"]).is_err());
    }

    #[test]
    fn test_page_size_and_rotation() {
        let doc = build_document(&[PageSpec::new(300.0, 400.0).rotated(-90)]);
        let page_id = doc.get_pages()[&1];

        assert_eq!(page_size(&doc, page_id), (300.0, 400.0));
        assert_eq!(page_rotation(&doc, page_id).degrees(), 270);
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = build_document(&[PageSpec::letter()]);
        let page_id = doc.get_pages()[&1];

        // Move the MediaBox up to the page tree root.
        let pages_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .and_then(Object::as_reference)
            .unwrap();
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");
        doc.get_dictionary_mut(pages_id).unwrap().set(
            "MediaBox",
            vec![0.into(), 0.into(), 100.into(), 50.into()],
        );

        assert_eq!(page_size(&doc, page_id), (100.0, 50.0));
    }

    #[test]
    fn test_missing_box_falls_back_to_letter() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert_eq!(page_size(&doc, page_id), DEFAULT_PAGE_SIZE);
        assert!(page_rotation(&doc, page_id).is_none());
    }
}
