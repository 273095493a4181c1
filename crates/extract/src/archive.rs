// crates/extract/src/archive.rs
//
// EPUB and Office OpenXML extraction. Both formats are ZIP containers
// of XML parts; the per-kind logic is only about which parts to read
// and in what order.

use crate::ExtractError;
use domain::doc::DocKind;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::LazyLock;
use zip::result::ZipError;
use zip::ZipArchive;

static SLIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("static regex"));

/// Concatenated text of every document item in an EPUB, in archive order.
pub fn read_epub(path: &Path) -> Result<String, ExtractError> {
    let mut archive = open_archive(path)?;
    epub_text(&mut archive)
}

/// Concatenated per-part text of a DOCX/PPTX/XLSX container.
pub fn read_office(path: &Path, kind: DocKind) -> Result<String, ExtractError> {
    let mut archive = open_archive(path)?;
    office_text(&mut archive, kind)
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ExtractError> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))
}

pub(crate) fn epub_text<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, ExtractError> {
    // Reading order comes from the OPF spine when the container is
    // well-formed; otherwise fall back to document items in archive
    // order.
    let names = match epub_spine(archive) {
        Some(hrefs) if !hrefs.is_empty() => hrefs,
        _ => archive
            .file_names()
            .filter(|name| !name.starts_with("META-INF/"))
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm")
            })
            .map(str::to_owned)
            .collect(),
    };

    let mut out = String::new();
    for name in names {
        // Spine entries may reference items the archive lacks; those
        // are simply absent from the output.
        if let Some(part) = try_read_part(archive, &name)? {
            out.push_str(&xml_text(&part)?);
            out.push('\n');
        }
    }

    Ok(out)
}

/// Resolve the EPUB spine: container.xml names the OPF, the OPF maps
/// manifest ids to hrefs, and the spine lists ids in reading order.
/// Any malformation collapses to `None` and the caller falls back.
fn epub_spine<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Option<Vec<String>> {
    let container = try_read_part(archive, "META-INF/container.xml").ok()??;
    let opf_path = xml_attribute(&container, "rootfile", "full-path")?;

    let opf = try_read_part(archive, &opf_path).ok()??;
    let opf_dir = match opf_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/"),
        None => String::new(),
    };

    let mut manifest: Vec<(String, String)> = Vec::new();
    let mut spine_ids: Vec<String> = Vec::new();

    let mut reader = Reader::from_str(&opf);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"item" => {
                    let id = attribute_value(&e, "id");
                    let href = attribute_value(&e, "href");
                    if let (Some(id), Some(href)) = (id, href) {
                        manifest.push((id, href));
                    }
                }
                b"itemref" => {
                    if let Some(idref) = attribute_value(&e, "idref") {
                        spine_ids.push(idref);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => return None,
            Ok(_) => {}
        }
    }

    let hrefs = spine_ids
        .iter()
        .filter_map(|id| {
            manifest
                .iter()
                .find(|(item_id, _)| item_id == id)
                .map(|(_, href)| format!("{opf_dir}{href}"))
        })
        .collect();
    Some(hrefs)
}

/// First occurrence of `attr` on an element with local name `element`.
fn xml_attribute(xml: &str, element: &str, attr: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == element.as_bytes() =>
            {
                if let Some(value) = attribute_value(&e, attr) {
                    return Some(value);
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn attribute_value(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn office_text<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    kind: DocKind,
) -> Result<String, ExtractError> {
    match kind {
        DocKind::Docx => xml_text(&read_part(archive, "word/document.xml")?),
        DocKind::Xlsx => match try_read_part(archive, "xl/sharedStrings.xml")? {
            Some(part) => xml_text(&part),
            // A workbook with no inline strings has nothing searchable.
            None => Ok(String::new()),
        },
        DocKind::Pptx => {
            let mut slides: Vec<(u64, String)> = archive
                .file_names()
                .filter_map(|name| {
                    let caps = SLIDE_RE.captures(name)?;
                    let number = caps.get(1)?.as_str().parse().ok()?;
                    Some((number, name.to_owned()))
                })
                .collect();
            slides.sort();

            let mut out = String::new();
            for (_, name) in slides {
                let part = read_part(archive, &name)?;
                out.push_str(&xml_text(&part)?);
                out.push('\n');
            }
            Ok(out)
        }
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, ExtractError> {
    try_read_part(archive, name)?
        .ok_or_else(|| ExtractError::Archive(format!("missing archive part: {name}")))
}

fn try_read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::Archive(e.to_string())),
    };

    let mut text = String::new();
    part.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Character data of an XML part, with paragraph-ish closing tags turned
/// into line breaks.
fn xml_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| ExtractError::Xml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) if is_block_end(e.local_name().as_ref()) => out.push('\n'),
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"br" => out.push('\n'),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            Ok(_) => {}
        }
    }

    Ok(out)
}

fn is_block_end(local_name: &[u8]) -> bool {
    matches!(local_name, b"p" | b"si" | b"tr" | b"title" | b"li")
}
