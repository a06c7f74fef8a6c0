//! Shared fixtures for integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use packslip_core::{MatchResult, OrderUnit, PageRecord, SourceDocument};
use std::path::{Path, PathBuf};

/// A PDF with one page per entry, each line drawn as its own text block
pub fn pdf_with_pages(pages: &[Vec<String>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * i as i64).into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Packing slip pages: order number, items marker, then the item lines
pub fn slip_pdf(orders: &[(u32, &[&str])]) -> Vec<u8> {
    let pages: Vec<Vec<String>> = orders
        .iter()
        .map(|(number, items)| {
            let mut lines = vec![format!("Order #{}", number), "ITEMS".to_string()];
            lines.extend(items.iter().map(|s| s.to_string()));
            lines
        })
        .collect();
    pdf_with_pages(&pages)
}

/// Shipping labels carrying the given order numbers
pub fn label_pdf(orders: &[u32]) -> Vec<u8> {
    let pages: Vec<Vec<String>> = orders
        .iter()
        .map(|number| {
            vec![
                "USPS PRIORITY MAIL".to_string(),
                format!("Order #{}", number),
                "TRACKING 9400 1000 0000 0000 0000 00".to_string(),
            ]
        })
        .collect();
    pdf_with_pages(&pages)
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Text of every page of a PDF file, in page order
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .keys()
        .map(|&n| doc.extract_text(&[n]).unwrap_or_default())
        .collect()
}

/// A unit resolved to `product` at `location`
pub fn unit(position: usize, product: Option<&str>, location: Option<&str>) -> OrderUnit {
    let mut slip = PageRecord::new(SourceDocument::Slip, position as u32, String::new());
    slip.resolved_product = product.map(str::to_string);
    slip.resolved_location = location.map(str::to_string);
    let mut label = PageRecord::new(SourceDocument::Label, position as u32, String::new());
    label.resolved_product = slip.resolved_product.clone();
    label.resolved_location = slip.resolved_location.clone();
    OrderUnit {
        position,
        slip,
        label,
        classification: match product {
            Some(p) => MatchResult::Product(p.to_string()),
            None => MatchResult::Unmatched,
        },
        variant: None,
        quantity: 1,
        hint: None,
    }
}
