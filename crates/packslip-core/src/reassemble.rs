//! Page reordering
//!
//! A reordered copy keeps every page object of the source and rebuilds the
//! page tree as a single flat `Pages` node. Attributes a page inherits from
//! an intermediate node are copied onto the page first so flattening does
//! not change how it renders.

use crate::error::{PackslipError, Result};
use crate::extract::PdfSource;
use crate::types::SortedBatch;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];
const MAX_TREE_DEPTH: usize = 64;

/// Copy `doc` with its pages in `order` (zero-based source indices).
/// `order` must be a permutation of the document's pages.
pub fn reorder_pages(doc: &Document, order: &[usize]) -> Result<Document> {
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    validate_permutation(order, pages.len())?;

    let mut out = doc.clone();
    let root_pages = root_pages_id(&out)?;

    for &page_id in &pages {
        let inherited = inherited_attributes(&out, page_id)?;
        let page = out
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PackslipError::Operation(format!("page {:?}: {}", page_id, e)))?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(root_pages));
    }

    let kids: Vec<Object> = order.iter().map(|&i| Object::Reference(pages[i])).collect();
    match out.objects.get_mut(&root_pages) {
        Some(Object::Dictionary(ref mut pages_dict)) => {
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(order.len() as i64));
        }
        _ => {
            return Err(PackslipError::Operation("Invalid pages dictionary".into()));
        }
    }

    // Intermediate page tree nodes are no longer referenced
    out.prune_objects();
    out.compress();
    debug!(pages = order.len(), "Reordered page tree");
    Ok(out)
}

/// Reordered slips and labels, serialized, in batch order
pub fn reassemble(
    slips: &PdfSource,
    labels: &PdfSource,
    batch: &SortedBatch,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let slips_out = reorder_pages(slips.document(), &batch.slip_order())?;
    let labels_out = reorder_pages(labels.document(), &batch.label_order())?;
    Ok((save(slips_out, slips.name())?, save(labels_out, labels.name())?))
}

fn save(mut doc: Document, name: &str) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PackslipError::Operation(format!("Save failed for {}: {}", name, e)))?;
    Ok(buffer)
}

fn validate_permutation(order: &[usize], page_count: usize) -> Result<()> {
    if order.len() != page_count {
        return Err(PackslipError::Operation(format!(
            "page order has {} entries for {} pages",
            order.len(),
            page_count
        )));
    }
    let mut seen = vec![false; page_count];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(PackslipError::Operation(format!(
                    "page {} appears twice in page order",
                    index + 1
                )))
            }
            None => {
                return Err(PackslipError::Operation(format!(
                    "page {} does not exist (document has {} pages)",
                    index + 1,
                    page_count
                )))
            }
        }
    }
    Ok(())
}

fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PackslipError::Operation("No Root in trailer".into()))?;
    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PackslipError::Operation("No Pages in catalog".into()))
}

/// Inheritable attributes the page lacks but an ancestor defines
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Result<Vec<(Vec<u8>, Object)>> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PackslipError::Operation(format!("page {:?}: {}", page_id, e)))?;

    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_object(node_id).and_then(Object::as_dict) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    Ok(found)
}
