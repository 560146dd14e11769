//! Metadata extraction from TEI XML documents.
//!
//! Documents produced by full-text extractors such as GROBID carry the
//! paper's header in tags like `<title>`, `<date>`, `<idno type="DOI">`,
//! `<keywords>` and `<abstract>`. For each of these the first element in
//! document order is read, including all text nested below it.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, warn};

use crate::error::{OptionExt, Result};
use crate::summary::PaperRecord;

/// Header fields looked up in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Doi,
    Title,
    Date,
    Keywords,
    Abstract,
}

impl Field {
    fn index(self) -> usize {
        self as usize
    }

    /// Field opened by this element, if any
    fn for_element(e: &BytesStart<'_>) -> Option<Field> {
        let name = e.local_name();

        match name.as_ref().to_ascii_lowercase().as_slice() {
            b"title" => Some(Field::Title),
            b"date" => Some(Field::Date),
            b"keywords" => Some(Field::Keywords),
            b"abstract" => Some(Field::Abstract),
            b"idno" if is_doi_idno(e) => Some(Field::Doi),
            _ => None,
        }
    }
}

fn is_doi_idno(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.local_name().as_ref() == b"type" && attr.value.as_ref() == b"DOI")
}

/// Raw text of the first occurrence of each field
#[derive(Debug, Default)]
struct RawFields {
    values: [Option<String>; 5],
}

impl RawFields {
    fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    fn seen(&self, field: Field) -> bool {
        self.values[field.index()].is_some()
    }
}

/// Paper ID from a file name: a trailing `.xml` is removed, then a trailing
/// `.tei`. The two strips are independent.
pub fn paper_id(file_name: &str) -> String {
    let id = file_name.strip_suffix(".xml").unwrap_or(file_name);
    let id = id.strip_suffix(".tei").unwrap_or(id);
    id.to_string()
}

/// Trimmed text, `None` when absent or blank
fn text_or_none(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Keyword container text as a comma-separated list, one entry per line
fn keywords_or_none(raw: Option<&str>) -> Option<String> {
    let joined = raw?
        .trim()
        .lines()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Two-letter language code of `text` (ISO 639-3 when no two-letter code
/// exists), or `None` if no language could be detected.
pub fn detect_language(text: &str) -> Option<String> {
    let info = whatlang::detect(text)?;

    let code = match info.lang() {
        // Mandarin has no 639-1 code of its own
        whatlang::Lang::Cmn => "zh",
        lang => isolang::Language::from_639_3(lang.code())
            .and_then(|l| l.to_639_1())
            .unwrap_or(lang.code()),
    };

    debug!(lang = code, confidence = info.confidence(), "Detected language");
    Some(code.to_string())
}

/// Scan an XML string for the header fields.
///
/// A syntax error ends the scan early; the fields read up to that point are
/// returned together with the error.
fn scan_fields(xml: &str) -> (RawFields, Option<quick_xml::Error>) {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut fields = RawFields::default();
    // Lowercased local names of the currently open elements
    let mut stack: Vec<Vec<u8>> = Vec::new();
    // Fields being captured, with the stack depth their element opened at
    let mut open: Vec<(Field, usize)> = Vec::new();
    let mut error = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                error = Some(e);
                break;
            }
        };

        match event {
            Event::Start(ref e) => {
                stack.push(e.local_name().as_ref().to_ascii_lowercase());
                if let Some(field) = Field::for_element(e) {
                    let capturing = open.iter().any(|(f, _)| *f == field);
                    if !fields.seen(field) && !capturing {
                        open.push((field, stack.len()));
                    }
                }
            }
            Event::Empty(ref e) => {
                if let Some(field) = Field::for_element(e) {
                    let capturing = open.iter().any(|(f, _)| *f == field);
                    if !fields.seen(field) && !capturing {
                        fields.values[field.index()] = Some(String::new());
                    }
                }
            }
            Event::End(ref e) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                // Closes the nearest element of that name and anything left
                // unclosed inside it; stray end tags are ignored
                if let Some(pos) = stack.iter().rposition(|n| *n == name) {
                    stack.truncate(pos);
                    while let Some(&(field, at)) = open.last() {
                        if at <= stack.len() {
                            break;
                        }
                        open.pop();
                        fields.values[field.index()].get_or_insert_with(String::new);
                    }
                }
            }
            Event::Text(ref e) if !open.is_empty() => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    Err(_) => String::from_utf8_lossy(e).into_owned(),
                };
                append_text(&mut fields, &open, &text);
            }
            Event::CData(ref e) if !open.is_empty() => {
                let text = String::from_utf8_lossy(e).into_owned();
                append_text(&mut fields, &open, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements at end of input keep what they collected
    for (field, _) in open {
        fields.values[field.index()].get_or_insert_with(String::new);
    }

    (fields, error)
}

fn append_text(fields: &mut RawFields, open: &[(Field, usize)], text: &str) {
    for (field, _) in open {
        fields.values[field.index()]
            .get_or_insert_with(String::new)
            .push_str(text);
    }
}

/// Build a record from XML content already in memory.
///
/// Malformed XML never loses the row: fields found before the first syntax
/// error are kept and the rest stay `None`.
pub fn extract_from_str(id: &str, xml: &str) -> PaperRecord {
    let (fields, error) = scan_fields(xml);
    if let Some(e) = error {
        warn!(id = %id, error = %e, "Malformed XML, keeping fields read so far");
    }

    let abstract_text = text_or_none(fields.get(Field::Abstract));
    let language = abstract_text.as_deref().and_then(detect_language);

    PaperRecord {
        id: id.to_string(),
        doi: text_or_none(fields.get(Field::Doi)),
        title: text_or_none(fields.get(Field::Title)),
        date: text_or_none(fields.get(Field::Date)),
        keywords: keywords_or_none(fields.get(Field::Keywords)),
        abstract_text,
        language,
    }
}

/// Read and extract one XML document
pub fn extract_paper(path: &Path) -> Result<PaperRecord> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_parse("XML path has no usable file name")?;

    let bytes = std::fs::read(path)?;
    let xml = String::from_utf8_lossy(&bytes);

    Ok(extract_from_str(&paper_id(file_name), &xml))
}

/// XML documents to process: `input` itself when it is a file, otherwise
/// the `*.xml` files directly inside it, sorted by name.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let is_xml = path.extension().is_some_and(|ext| ext == "xml");
        if is_xml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Records extracted from a batch, plus the documents that failed
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub records: Vec<PaperRecord>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Extract every document in order. A document that cannot be read is
/// logged and left out; the rest of the batch continues.
pub fn extract_all(paths: &[PathBuf]) -> ExtractReport {
    let mut report = ExtractReport::default();

    for path in paths {
        match extract_paper(path) {
            Ok(record) => {
                debug!(id = %record.id, "Extracted");
                report.records.push(record);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping document");
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    info!(
        extracted = report.records.len(),
        failed = report.failed.len(),
        "Extraction complete"
    );
    report
}
