//! Document engine backed by lopdf
//!
//! Load, page selection, rotation, crop box and serialization. Merging
//! lives in [`crate::merge`].

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::PdfToolError;
use crate::selector::PageSet;
use crate::tool::Rotation;

/// US Letter, used when a page has no MediaBox anywhere in its tree.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Parse PDF bytes, refusing documents we cannot read without a password.
pub fn load(bytes: &[u8]) -> Result<Document, PdfToolError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfToolError::ParseError(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfToolError::ParseError(
            "document is password-protected".into(),
        ));
    }
    Ok(doc)
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Compress and serialize a document.
pub fn save(mut doc: Document) -> Result<Vec<u8>, PdfToolError> {
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolError::SerializationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Build a new document holding exactly `pages`, in ascending order.
///
/// Works by whitelist: clone the source, drop every page outside the set,
/// then prune objects that are no longer reachable.
pub fn copy_pages(doc: &Document, pages: &PageSet) -> Result<Document, PdfToolError> {
    let total = page_count(doc);
    if pages.is_empty() {
        return Err(PdfToolError::NoPagesSelected);
    }
    if let Some(last) = pages.indices().last() {
        if *last >= total {
            return Err(PdfToolError::OperationError(format!(
                "Page {} does not exist (document has {} pages)",
                last + 1,
                total
            )));
        }
    }

    let mut new_doc = doc.clone();

    // lopdf numbers pages from 1
    let to_delete: Vec<u32> = pages
        .complement(total)
        .iter()
        .map(|index| index as u32 + 1)
        .collect();
    if !to_delete.is_empty() {
        new_doc.delete_pages(&to_delete);
        new_doc.prune_objects();
    }

    Ok(new_doc)
}

/// Set an absolute rotation on every page in `pages`. Indices past the end
/// of the document are ignored.
pub fn set_rotation(
    doc: &mut Document,
    pages: &PageSet,
    rotation: Rotation,
) -> Result<(), PdfToolError> {
    let page_ids = page_ids(doc);
    for index in pages.iter() {
        let Some(&page_id) = page_ids.get(index) else {
            continue;
        };
        page_dict_mut(doc, page_id)?.set("Rotate", Object::Integer(rotation.degrees()));
    }
    Ok(())
}

/// Shrink every page's visible area by `margin` points on all four sides.
/// A negative margin grows it past the media box instead.
///
/// All boxes are computed before any page is touched, so a page that is too
/// small leaves the document unmodified.
pub fn crop(doc: &mut Document, margin: i64) -> Result<(), PdfToolError> {
    let inset = margin as f64;
    let mut crop_boxes = Vec::new();

    for (index, page_id) in page_ids(doc).into_iter().enumerate() {
        let [llx, lly, urx, ury] = media_box(doc, page_id);
        let (width, height) = (urx - llx, ury - lly);
        if width <= 2.0 * inset || height <= 2.0 * inset {
            return Err(PdfToolError::MarginTooLarge {
                margin,
                page: index + 1,
            });
        }
        crop_boxes.push((
            page_id,
            [llx + inset, lly + inset, urx - inset, ury - inset],
        ));
    }

    for (page_id, crop_box) in crop_boxes {
        let rect = crop_box.iter().map(|&v| Object::Real(v as f32)).collect();
        page_dict_mut(doc, page_id)?.set("CropBox", Object::Array(rect));
    }
    Ok(())
}

/// Page object ids in document order.
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfToolError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfToolError::OperationError(format!("Invalid page object: {}", e)))
}

/// Look up a page attribute, walking up the page tree for inherited values.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).and_then(Object::as_dict).ok()?;

    // Bounded so a cyclic Parent chain cannot hang us
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_object(parent_id).and_then(Object::as_dict).ok()?;
    }
    None
}

/// MediaBox of a page, inheriting from parents if necessary.
fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| parse_box_array(array))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// Parse a box array [x1, y1, x2, y2], normalizing corner order.
fn parse_box_array(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }

    let mut values = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        values[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }

    let [x1, y1, x2, y2] = values;
    Some([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, page_labels};
    use crate::selector::parse_page_set;
    use pretty_assertions::assert_eq;

    fn crop_box(doc: &Document, page_id: ObjectId) -> Vec<f32> {
        doc.get_object(page_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"CropBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| match v {
                Object::Real(r) => *r,
                Object::Integer(i) => *i as f32,
                _ => panic!("non-numeric crop box"),
            })
            .collect()
    }

    #[test]
    fn test_load_rejects_garbage() {
        let err = load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfToolError::ParseError(_)));
    }

    #[test]
    fn test_page_count() {
        let doc = load(&create_test_pdf(7, "Count")).unwrap();
        assert_eq!(page_count(&doc), 7);
    }

    #[test]
    fn test_copy_pages_keeps_selection_in_order() {
        let doc = load(&create_test_pdf(6, "Src")).unwrap();
        let selected = parse_page_set("5, 2, 3", 6);

        let copy = copy_pages(&doc, &selected).unwrap();
        let bytes = save(copy).unwrap();

        assert_eq!(page_labels(&bytes), vec!["Src-Page-2", "Src-Page-3", "Src-Page-5"]);
    }

    #[test]
    fn test_copy_pages_leaves_source_untouched() {
        let doc = load(&create_test_pdf(4, "Src")).unwrap();
        copy_pages(&doc, &parse_page_set("1", 4)).unwrap();
        assert_eq!(page_count(&doc), 4);
    }

    #[test]
    fn test_copy_pages_rejects_empty_selection() {
        let doc = load(&create_test_pdf(3, "Src")).unwrap();
        let err = copy_pages(&doc, &PageSet::default()).unwrap_err();
        assert!(matches!(err, PdfToolError::NoPagesSelected));
    }

    #[test]
    fn test_copy_pages_rejects_foreign_page_set() {
        let doc = load(&create_test_pdf(2, "Src")).unwrap();
        let err = copy_pages(&doc, &PageSet::all(5)).unwrap_err();
        assert!(matches!(err, PdfToolError::OperationError(_)));
    }

    #[test]
    fn test_set_rotation_only_touches_selected_pages() {
        let mut doc = load(&create_test_pdf(3, "Rot")).unwrap();
        set_rotation(&mut doc, &parse_page_set("2", 3), Rotation::Deg180).unwrap();

        let ids = page_ids(&doc);
        let rotate = |id: ObjectId| {
            doc.get_object(id)
                .unwrap()
                .as_dict()
                .unwrap()
                .get(b"Rotate")
                .ok()
                .and_then(|o| o.as_i64().ok())
        };
        assert_eq!(rotate(ids[0]), None);
        assert_eq!(rotate(ids[1]), Some(180));
        assert_eq!(rotate(ids[2]), None);
    }

    #[test]
    fn test_set_rotation_is_absolute() {
        let mut doc = load(&create_test_pdf(1, "Rot")).unwrap();
        set_rotation(&mut doc, &PageSet::all(1), Rotation::Deg90).unwrap();
        set_rotation(&mut doc, &PageSet::all(1), Rotation::Deg90).unwrap();

        let id = page_ids(&doc)[0];
        let value = inherited_attribute(&doc, id, b"Rotate").unwrap().as_i64().unwrap();
        assert_eq!(value, 90);
    }

    #[test]
    fn test_crop_shrinks_every_page() {
        let mut doc = load(&create_test_pdf(2, "Crop")).unwrap();
        crop(&mut doc, 20).unwrap();

        for id in page_ids(&doc) {
            assert_eq!(crop_box(&doc, id), vec![20.0, 20.0, 592.0, 772.0]);
        }
    }

    #[test]
    fn test_negative_margin_grows_visible_area() {
        let mut doc = load(&create_test_pdf(1, "Crop")).unwrap();
        crop(&mut doc, -10).unwrap();

        let id = page_ids(&doc)[0];
        assert_eq!(crop_box(&doc, id), vec![-10.0, -10.0, 622.0, 802.0]);
    }

    #[test]
    fn test_crop_rejects_oversized_margin_without_modifying() {
        let mut doc = load(&create_test_pdf(2, "Crop")).unwrap();
        let err = crop(&mut doc, 306).unwrap_err();
        assert!(matches!(err, PdfToolError::MarginTooLarge { margin: 306, page: 1 }));

        let id = page_ids(&doc)[0];
        assert!(inherited_attribute(&doc, id, b"CropBox").is_none());
    }

    #[test]
    fn test_parse_box_array_normalizes_corners() {
        let array = vec![
            Object::Integer(612),
            Object::Real(792.0),
            Object::Integer(0),
            Object::Integer(0),
        ];
        assert_eq!(parse_box_array(&array), Some([0.0, 0.0, 612.0, 792.0]));
        assert_eq!(parse_box_array(&array[..3]), None);
    }
}
