//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::engine::{inherited_attribute, page_ids};
use crate::error::PdfToolError;
use lopdf::{Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Merge documents into one, keeping every page in input order
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Copy inherited attributes onto each page, since the page tree
///    gets flattened
/// 3. Use the first document as the destination
/// 4. For each remaining document:
///    a. Offset its object IDs past the destination's highest ID
///    b. Import all objects with remapped IDs
///    c. Append its pages to the destination
/// 5. Point the root page node at all pages and prune the leftovers
pub fn merge(documents: Vec<Document>) -> Result<Document, PdfToolError> {
    let mut documents = documents.into_iter();
    let mut dest = documents
        .next()
        .ok_or_else(|| PdfToolError::OperationError("No documents to merge".into()))?;

    materialize_inherited_attributes(&mut dest)?;
    let mut dest_page_refs = page_ids(&dest);

    for mut source in documents {
        materialize_inherited_attributes(&mut source)?;
        let source_pages = page_ids(&source);

        let id_offset = dest.max_id;

        for (old_id, mut object) in source.objects.into_iter() {
            remap_object_refs(&mut object, id_offset);
            dest.objects.insert((old_id.0 + id_offset, old_id.1), object);
        }

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(number, generation)| (number + id_offset, generation)),
        );

        dest.max_id = dest.max_id.max(source.max_id + id_offset);
    }

    update_page_tree(&mut dest, &dest_page_refs)?;
    dest.prune_objects();

    Ok(dest)
}

/// Copy inheritable attributes down onto every page so they survive the
/// page tree being flattened.
fn materialize_inherited_attributes(doc: &mut Document) -> Result<(), PdfToolError> {
    for page_id in page_ids(doc) {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| {
                inherited_attribute(doc, page_id, key).map(|value| (*key, value.clone()))
            })
            .collect();

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfToolError::OperationError(format!("Invalid page object: {}", e)))?;
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
    }
    Ok(())
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: &mut Object, offset: u32) {
    match obj {
        Object::Reference(id) => id.0 += offset,
        Object::Array(arr) => arr
            .iter_mut()
            .for_each(|item| remap_object_refs(item, offset)),
        Object::Dictionary(dict) => dict
            .iter_mut()
            .for_each(|(_, value)| remap_object_refs(value, offset)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, value)| remap_object_refs(value, offset)),
        _ => {}
    }
}

/// Make the catalog's root page node the direct parent of every page
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfToolError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfToolError::OperationError("No Pages in catalog".into()))?;

    for &page_id in page_refs {
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(&page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let Some(Object::Dictionary(pages_dict)) = doc.objects.get_mut(&pages_id) else {
        return Err(PdfToolError::OperationError(
            "Invalid pages dictionary".into(),
        ));
    };

    let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    // Already copied onto each page; left here they would leak onto pages
    // from the other documents.
    for key in INHERITABLE {
        pages_dict.remove(key);
    }

    Ok(())
}
