//! Snapshot codec
//!
//! XML encoding and decoding of the whole collection.
//!
//! Every optional field is written as an empty element when absent, so a
//! snapshot always carries the full field list for each record.

use std::collections::HashSet;

use chrono::NaiveDate;
use roxmltree::{Document, Node};

use crate::error::{BeingError, Result};
use crate::model::{HumanBeing, Key, RecordDraft};

const ROOT_TAG: &str = "humanBeings";
const RECORD_TAG: &str = "humanBeing";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of a lenient decode: the valid records plus a reason per skipped one
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub records: Vec<HumanBeing>,
    pub skipped: Vec<String>,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode records (expected in key order) as an XML document
pub fn encode(records: &[HumanBeing]) -> String {
    let mut out = String::with_capacity(128 + records.len() * 512);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<humanBeings>\n");

    for record in records {
        let coordinates = record.coordinates();

        out.push_str(&format!("  <humanBeing id=\"{}\">\n", record.id()));
        element(&mut out, 2, "name", record.name());
        out.push_str("    <coordinates>\n");
        element(&mut out, 3, "x", &coordinates.x.to_string());
        element(&mut out, 3, "y", &optional(coordinates.y));
        out.push_str("    </coordinates>\n");
        element(
            &mut out,
            2,
            "creationDate",
            &record.creation_date().format(DATE_FORMAT).to_string(),
        );
        element(&mut out, 2, "realHero", &optional(record.real_hero()));
        element(&mut out, 2, "hasToothpick", &optional(record.has_toothpick()));
        element(&mut out, 2, "impactSpeed", &record.impact_speed().to_string());
        element(&mut out, 2, "soundtrackName", record.soundtrack_name());
        element(&mut out, 2, "minutesOfWaiting", &optional(record.minutes_of_waiting()));
        element(&mut out, 2, "weaponType", record.weapon_type().as_str());
        out.push_str("    <car>\n");
        element(&mut out, 3, "name", record.car().map(|c| c.name()).unwrap_or(""));
        out.push_str("    </car>\n");
        out.push_str("  </humanBeing>\n");
    }

    out.push_str("</humanBeings>\n");
    out
}

fn element(out: &mut String, depth: usize, tag: &str, text: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(tag);
    out.push('>');
    escape_into(out, text);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a snapshot, failing on the first invalid record
pub fn decode(xml: &str) -> Result<Vec<HumanBeing>> {
    let doc = parse_document(xml)?;
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for node in record_nodes(&doc) {
        let record = decode_record(node)?;
        if !seen.insert(record.id()) {
            return Err(BeingError::Snapshot(format!("duplicate id {}", record.id())));
        }
        records.push(record);
    }

    Ok(records)
}

/// Decode a snapshot, skipping invalid records instead of failing.
/// Only a malformed document is an error.
pub fn decode_lenient(xml: &str) -> Result<DecodeReport> {
    let doc = parse_document(xml)?;
    let mut seen = HashSet::new();
    let mut report = DecodeReport::default();

    for (index, node) in record_nodes(&doc).enumerate() {
        match decode_record(node) {
            Ok(record) if seen.insert(record.id()) => report.records.push(record),
            Ok(record) => report
                .skipped
                .push(format!("record #{}: duplicate id {}", index + 1, record.id())),
            Err(e) => report.skipped.push(format!("record #{}: {}", index + 1, e)),
        }
    }

    Ok(report)
}

fn parse_document(xml: &str) -> Result<Document<'_>> {
    if xml.trim().is_empty() {
        return Err(BeingError::Snapshot("snapshot is empty".to_string()));
    }

    let doc = Document::parse(xml)?;
    let root = doc.root_element().tag_name().name();
    if root != ROOT_TAG {
        return Err(BeingError::Snapshot(format!(
            "unexpected root element <{}> (expected <{}>)",
            root, ROOT_TAG
        )));
    }
    Ok(doc)
}

fn record_nodes<'a, 'input>(
    doc: &'a Document<'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == RECORD_TAG)
}

fn decode_record(node: Node<'_, '_>) -> Result<HumanBeing> {
    let id: Key = node
        .attribute("id")
        .ok_or_else(|| BeingError::Snapshot("missing id attribute".to_string()))?
        .trim()
        .parse()
        .map_err(|_| BeingError::Snapshot("id is not a positive integer".to_string()))?;

    let creation_date = NaiveDate::parse_from_str(text(node, "creationDate")?.trim(), DATE_FORMAT)
        .map_err(|e| BeingError::Snapshot(format!("id {}: bad creationDate: {}", id, e)))?;

    let coordinates = child(node, "coordinates")?;

    let mut draft = RecordDraft::default();
    let fields = [
        ("name", text(node, "name")?),
        ("x", text(coordinates, "x")?),
        ("y", text(coordinates, "y")?),
        ("real_hero", text(node, "realHero")?),
        ("has_toothpick", text(node, "hasToothpick")?),
        ("impact_speed", text(node, "impactSpeed")?),
        ("soundtrack_name", text(node, "soundtrackName")?),
        ("minutes_of_waiting", text(node, "minutesOfWaiting")?),
        ("weapon_type", text(node, "weaponType")?),
    ];
    for (field, value) in fields {
        let value = if field == "name" || field == "soundtrack_name" {
            value
        } else {
            value.trim()
        };
        draft.set(field, value)?;
    }

    // <car> may be omitted entirely by hand-written snapshots
    if let Some(car) = find_child(node, "car") {
        draft.set("car", text(car, "name")?)?;
    }

    HumanBeing::new(id, creation_date, draft)
        .map_err(|e| BeingError::Snapshot(format!("id {}: {}", id, e)))
}

fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Result<Node<'a, 'input>> {
    find_child(node, tag).ok_or_else(|| BeingError::Snapshot(format!("missing <{}>", tag)))
}

fn text<'a>(node: Node<'a, '_>, tag: &str) -> Result<&'a str> {
    Ok(child(node, tag)?.text().unwrap_or(""))
}
