//! Page tree access: inherited attributes, resources and content streams.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::domain::PageBox;
use crate::domain::ports::PdfStampError;

/// Guards against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Resource names the stamp content refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StampNames {
    pub font: String,
    pub signature: String,
    pub qr: String,
}

/// Objects added to the document for one stamp.
#[derive(Debug, Clone, Copy)]
pub(super) struct StampObjects {
    pub font: ObjectId,
    pub signature: ObjectId,
    pub qr: ObjectId,
}

fn corrupt(message: impl Into<String>) -> PdfStampError {
    PdfStampError::corrupt_document(message)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfStampError> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|_| corrupt("page object is not a dictionary"))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfStampError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| corrupt("page object is not a dictionary"))
}

/// Look `key` up on the page, then on its ancestors.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let id = current?;
        let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Object id of the zero-based `page_index`.
pub(super) fn page_id(doc: &Document, page_index: u32) -> Result<ObjectId, PdfStampError> {
    let pages = doc.get_pages();
    page_index
        .checked_add(1)
        .and_then(|number| pages.get(&number).copied())
        .ok_or_else(|| PdfStampError::page_out_of_range(page_index, pages.len()))
}

/// The page's effective MediaBox, normalised so that width and height are
/// positive.
pub(super) fn media_box(doc: &Document, page_id: ObjectId) -> Result<PageBox, PdfStampError> {
    let corners: Vec<f64> = inherited(doc, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| resolve(doc, item).and_then(number))
                .collect()
        })
        .unwrap_or_default();
    let [x0, y0, x1, y1] = corners.as_slice() else {
        return Err(corrupt("page has no usable MediaBox"));
    };
    Ok(PageBox {
        llx: x0.min(*x1),
        lly: y0.min(*y1),
        width: (x1 - x0).abs(),
        height: (y1 - y0).abs(),
    })
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

fn free_name(dict: &Dictionary, prefix: &str) -> String {
    let mut suffix = 1_u32;
    loop {
        let name = format!("{prefix}{suffix}");
        if !dict.has(name.as_bytes()) {
            return name;
        }
        suffix = suffix.saturating_add(1);
    }
}

/// Give the page its own resource dictionary holding everything it
/// inherited plus the stamp objects under names no earlier round used.
pub(super) fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    objects: StampObjects,
) -> Result<StampNames, PdfStampError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut xobjects = sub_dictionary(doc, &resources, b"XObject");
    let mut fonts = sub_dictionary(doc, &resources, b"Font");

    let signature = free_name(&xobjects, "CsSig");
    xobjects.set(signature.clone(), objects.signature);
    let qr = free_name(&xobjects, "CsQr");
    xobjects.set(qr.clone(), objects.qr);
    let font = free_name(&fonts, "CsFont");
    fonts.set(font.clone(), objects.font);

    resources.set("XObject", xobjects);
    resources.set("Font", fonts);
    page_dict_mut(doc, page_id)?.set("Resources", resources);
    Ok(StampNames {
        font,
        signature,
        qr,
    })
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfStampError> {
    let contents = match page_dict(doc, page_id)?.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Stream(_)) => vec![Object::Reference(*id)],
            _ => return Err(corrupt("page contents reference is dangling")),
        },
        Ok(_) => return Err(corrupt("page contents have an unexpected type")),
        Err(_) => Vec::new(),
    };
    Ok(contents)
}

/// Isolate the existing page content in `q ... Q` and append `stamp`.
pub(super) fn wrap_contents(
    doc: &mut Document,
    page_id: ObjectId,
    stamp: Vec<u8>,
) -> Result<(), PdfStampError> {
    let existing = existing_contents(doc, page_id)?;
    let open = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let mut body = b"Q\n".to_vec();
    body.extend(stamp);
    let close = doc.add_object(Stream::new(dictionary! {}, body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing);
    contents.push(Object::Reference(close));
    page_dict_mut(doc, page_id)?.set("Contents", contents);
    Ok(())
}
