//! Builds the output document one page at a time.
//!
//! Pages are deep-imported from their source documents: every object the
//! page reaches is copied under a fresh id. Objects are remembered per
//! source file, so two pages of the same file share their fonts and images
//! in the output instead of carrying a copy each.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::HashMap;

use crate::config::{CompressionLevel, Metadata};
use crate::error::{PdfCollateError, Result};
use crate::merge::metadata::MetadataManager;
use crate::session::{FileId, Rotation};
use crate::utils::inherited_attribute;

/// PDF version of the output document.
pub const OUTPUT_VERSION: &str = "1.7";

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// An output document under construction.
#[derive(Debug)]
pub struct PageAssembler {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    imported: HashMap<(FileId, ObjectId), ObjectId>,
}

impl PageAssembler {
    /// Start an empty document.
    pub fn create() -> Self {
        let mut document = Document::with_version(OUTPUT_VERSION);
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            imported: HashMap::new(),
        }
    }

    /// Copy page `page_number` (1-based) of `source` into the output.
    ///
    /// The returned page is not part of the page tree until it is passed
    /// to [`add_page`](Self::add_page). Inherited attributes are copied
    /// onto the page itself. A reference to a source page that was already
    /// copied points at its first copy; other page references become null.
    pub fn copy_page(
        &mut self,
        file_id: FileId,
        source: &Document,
        page_number: u32,
    ) -> Result<ObjectId> {
        let source_page_id = *source.get_pages().get(&page_number).ok_or_else(|| {
            PdfCollateError::merge_failed(format!(
                "File {file_id} has no page {page_number}"
            ))
        })?;

        let mut page = source.get_dictionary(source_page_id)?.clone();
        for key in INHERITABLE {
            if !page.has(key)
                && let Some(value) = inherited_attribute(source, source_page_id, key)
            {
                page.set(key.to_vec(), value);
            }
        }
        page.remove(b"Parent");

        let page_id = self.document.new_object_id();
        self.imported
            .entry((file_id, source_page_id))
            .or_insert(page_id);

        let mut page = self.import_dictionary(file_id, source, &page);
        page.set("Parent", Object::Reference(self.pages_id));
        self.document
            .objects
            .insert(page_id, Object::Dictionary(page));

        Ok(page_id)
    }

    /// Add `rotation` to the page's own `/Rotate`.
    ///
    /// Returns the resulting rotation.
    pub fn set_rotation(&mut self, page_id: ObjectId, rotation: Rotation) -> Result<Rotation> {
        let page = self.document.get_dictionary_mut(page_id)?;
        let current = page
            .get(b"Rotate")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|degrees| i32::try_from(degrees).ok())
            .and_then(|degrees| Rotation::from_degrees(degrees).ok())
            .unwrap_or_default();

        let combined = current.combine(rotation);
        if combined.is_none() {
            page.remove(b"Rotate");
        } else {
            page.set("Rotate", i64::from(combined.degrees()));
        }
        Ok(combined)
    }

    /// Append a copied page to the page tree.
    pub fn add_page(&mut self, page_id: ObjectId) {
        self.kids.push(page_id);
    }

    /// Pages added so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Close the page tree and catalog and return the document.
    pub fn finish(mut self, metadata: &Metadata) -> Result<Document> {
        let kids: Vec<Object> = self.kids.iter().copied().map(Object::Reference).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        MetadataManager::new().set_metadata(&mut self.document, metadata)?;
        Ok(self.document)
    }

    /// Finish, compress and serialise.
    pub fn save(self, metadata: &Metadata, compression: CompressionLevel) -> Result<Vec<u8>> {
        let mut document = self.finish(metadata)?;

        match compression {
            CompressionLevel::None => {}
            CompressionLevel::Standard => document.compress(),
            CompressionLevel::Maximum => {
                document.compress();
                document.prune_objects();
            }
        }
        document.renumber_objects();

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|e| PdfCollateError::merge_failed(format!("Failed to serialise: {e}")))?;
        Ok(bytes)
    }

    fn import_object(&mut self, file_id: FileId, source: &Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.import_reference(file_id, source, *id),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(file_id, source, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.import_dictionary(file_id, source, dict))
            }
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.import_dictionary(file_id, source, &stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn import_dictionary(
        &mut self,
        file_id: FileId,
        source: &Document,
        dict: &Dictionary,
    ) -> Dictionary {
        let mut imported = Dictionary::new();
        for (key, value) in dict.iter() {
            imported.set(key.clone(), self.import_object(file_id, source, value));
        }
        imported
    }

    fn import_reference(&mut self, file_id: FileId, source: &Document, id: ObjectId) -> Object {
        if let Some(&mapped) = self.imported.get(&(file_id, id)) {
            return Object::Reference(mapped);
        }

        let Ok(object) = source.get_object(id) else {
            return Object::Null;
        };
        if is_page_tree_node(object) {
            return Object::Null;
        }

        // Registered before recursing so cycles resolve to the new id.
        let new_id = self.document.new_object_id();
        self.imported.insert((file_id, id), new_id);
        let copy = self.import_object(file_id, source, object);
        self.document.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let Ok(dict) = object.as_dict() else {
        return false;
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PageSpec, build_document};
    use crate::utils::{page_rotation, page_size};

    fn pages(doc: &Document) -> Vec<ObjectId> {
        doc.get_pages().into_values().collect()
    }

    #[test]
    fn test_copy_pages_in_chosen_order() {
        let a = build_document(&[PageSpec::letter(), PageSpec::a4()]);
        let b = build_document(&[PageSpec::new(300.0, 400.0)]);

        let mut assembler = PageAssembler::create();
        for (file, doc, page) in [(FileId(2), &b, 1), (FileId(1), &a, 2), (FileId(1), &a, 1)] {
            let id = assembler.copy_page(file, doc, page).unwrap();
            assembler.add_page(id);
        }
        assert_eq!(assembler.page_count(), 3);

        let out = assembler.finish(&Metadata::default()).unwrap();
        let sizes: Vec<_> = pages(&out).into_iter().map(|id| page_size(&out, id)).collect();
        assert_eq!(sizes, vec![(300.0, 400.0), (595.0, 842.0), (612.0, 792.0)]);
    }

    #[test]
    fn test_inherited_resources_are_copied_and_shared() {
        let a = build_document(&[PageSpec::letter(), PageSpec::letter()]);

        let mut assembler = PageAssembler::create();
        let first = assembler.copy_page(FileId(1), &a, 1).unwrap();
        let second = assembler.copy_page(FileId(1), &a, 2).unwrap();

        let font = |id: ObjectId| {
            assembler
                .document
                .get_dictionary(id)
                .and_then(|page| page.get(b"Resources"))
                .and_then(Object::as_dict)
                .and_then(|resources| resources.get(b"Font"))
                .and_then(Object::as_dict)
                .and_then(|fonts| fonts.get(b"F1"))
                .and_then(Object::as_reference)
                .unwrap()
        };
        let shared = font(first);
        assert_eq!(shared, font(second));
        assert!(assembler.document.get_dictionary(shared).is_ok());
    }

    #[test]
    fn test_same_source_in_two_files_is_not_shared() {
        let a = build_document(&[PageSpec::letter()]);

        let mut assembler = PageAssembler::create();
        let before = assembler.document.objects.len();
        assembler.copy_page(FileId(1), &a, 1).unwrap();
        let one_copy = assembler.document.objects.len() - before;
        assembler.copy_page(FileId(2), &a, 1).unwrap();

        assert_eq!(assembler.document.objects.len() - before, one_copy * 2);
    }

    #[test]
    fn test_rotation_adds_to_source_rotate() {
        let a = build_document(&[PageSpec::letter().rotated(90), PageSpec::letter()]);

        let mut assembler = PageAssembler::create();
        let rotated = assembler.copy_page(FileId(1), &a, 1).unwrap();
        let plain = assembler.copy_page(FileId(1), &a, 2).unwrap();

        let turn = |d| Rotation::from_degrees(d).unwrap();
        assert_eq!(assembler.set_rotation(rotated, turn(270)).unwrap(), Rotation::NONE);
        assert_eq!(assembler.set_rotation(plain, turn(-90)).unwrap(), turn(270));
        assembler.add_page(rotated);
        assembler.add_page(plain);

        let out = assembler.finish(&Metadata::default()).unwrap();
        let ids = pages(&out);
        assert_eq!(page_rotation(&out, ids[0]), Rotation::NONE);
        assert_eq!(page_rotation(&out, ids[1]), turn(270));
    }

    #[test]
    fn test_page_links_resolve_to_first_copy() {
        let mut a = build_document(&[PageSpec::letter(), PageSpec::letter()]);
        let source = pages(&a);
        a.get_dictionary_mut(source[1]).unwrap().set(
            "Annots",
            vec![Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Dest" => vec![Object::Reference(source[0]), "Fit".into()],
            })],
        );

        let mut assembler = PageAssembler::create();
        let first = assembler.copy_page(FileId(1), &a, 1).unwrap();
        let again = assembler.copy_page(FileId(1), &a, 1).unwrap();
        let linking = assembler.copy_page(FileId(1), &a, 2).unwrap();
        assert_ne!(first, again);

        let target = assembler
            .document
            .get_dictionary(linking)
            .and_then(|page| page.get(b"Annots"))
            .and_then(Object::as_array)
            .and_then(|annots| annots[0].as_dict())
            .and_then(|link| link.get(b"Dest"))
            .and_then(Object::as_array)
            .and_then(|dest| dest[0].as_reference())
            .unwrap();
        assert_eq!(target, first);
    }

    #[test]
    fn test_missing_page() {
        let a = build_document(&[PageSpec::letter()]);
        let mut assembler = PageAssembler::create();
        let result = assembler.copy_page(FileId(1), &a, 4);
        assert!(matches!(result, Err(PdfCollateError::Merge { .. })));
    }

    #[test]
    fn test_save_produces_loadable_pdf() {
        let a = build_document(&[PageSpec::letter(), PageSpec::a4()]);

        for level in [CompressionLevel::None, CompressionLevel::Standard, CompressionLevel::Maximum] {
            let mut assembler = PageAssembler::create();
            for page in [2, 1] {
                let id = assembler.copy_page(FileId(1), &a, page).unwrap();
                assembler.add_page(id);
            }
            let bytes = assembler.save(&Metadata::default(), level).unwrap();

            let reloaded = Document::load_mem(&bytes).unwrap();
            let ids = pages(&reloaded);
            assert_eq!(ids.len(), 2, "compression {level}");
            assert_eq!(page_size(&reloaded, ids[0]), (595.0, 842.0));
        }
    }
}
