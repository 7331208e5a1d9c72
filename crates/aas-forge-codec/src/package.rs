//! AASX package reading and writing.
//!
//! An AASX file is an OPC (ZIP) container. The writer lays it out as:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels                      origin, thumbnail, core properties
//! aasx/aasx-origin
//! aasx/_rels/aasx-origin.rels      -> /aasx/xml/content.xml
//! aasx/xml/content.xml             AAS 3.1 XML
//! aasx/xml/_rels/content.xml.rels  supplementary files
//! aasx/model.json                  AAS JSON
//! aasx/files/...                   attachments
//! docProps/core.xml
//! ```

use crate::document::{decode_auto, Decoded};
use crate::encoding::{decode_part_name, encode_part_name, normalize_part_path};
use crate::error::CodecError;
use crate::xml::dom;
use aas_forge_core::model::ElementContent;
use aas_forge_core::{ConceptDescription, Environment, SubmodelElement};
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Relationship types used in AASX packages.
pub mod relationship {
    /// Package root to the origin part.
    pub const AASX_ORIGIN: &str = "http://admin-shell.io/aasx/relationships/aasx-origin";
    /// Origin to the AAS document.
    pub const AAS_SPEC: &str = "http://admin-shell.io/aasx/relationships/aas-spec";
    /// AAS document to a supplementary file.
    pub const AAS_SUPPL: &str = "http://admin-shell.io/aasx/relationships/aas-suppl";
    /// Package thumbnail.
    pub const THUMBNAIL: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";
    /// Core properties.
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
}

const CONTENT_TYPES_PART: &str = "/[Content_Types].xml";
const ORIGIN_PART: &str = "/aasx/aasx-origin";
const ORIGIN_RELS_PART: &str = "/aasx/_rels/aasx-origin.rels";
const XML_PART: &str = "/aasx/xml/content.xml";
const XML_RELS_PART: &str = "/aasx/xml/_rels/content.xml.rels";
const JSON_PART: &str = "/aasx/model.json";
const CORE_PART: &str = "/docProps/core.xml";
const FILES_DIR: &str = "/aasx/files";

/// A decoded AASX package.
#[derive(Debug, Clone)]
pub struct AasxPackage {
    /// The decoded AAS document
    pub document: Decoded,
    /// Part path the document was read from
    pub origin_part: String,
    /// Every other payload part, keyed by absolute part path
    pub attachments: BTreeMap<String, Vec<u8>>,
}

impl AasxPackage {
    /// Look up an attachment by path.
    ///
    /// Accepts paths with or without a leading slash and percent-encoded names.
    #[must_use]
    pub fn attachment(&self, path: &str) -> Option<&[u8]> {
        let normalized = normalize_part_path(path);
        self.attachments
            .get(&normalized)
            .or_else(|| {
                decode_part_name(path)
                    .ok()
                    .and_then(|decoded| self.attachments.get(&decoded))
            })
            .map(Vec::as_slice)
    }
}

/// Read an AASX package.
///
/// # Errors
///
/// Returns error if the archive is unreadable or contains no AAS document.
pub fn read_aasx(bytes: &[u8]) -> Result<AasxPackage, CodecError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CodecError::archive(format!("failed to open package: {e}")))?;

    let mut parts = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let raw_name = file.name().to_string();
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| CodecError::archive(format!("failed to read {raw_name}: {e}")))?;
        let path = decode_part_name(&raw_name).unwrap_or_else(|_| normalize_part_path(&raw_name));
        parts.insert(path, content);
    }

    let origin_part = locate_document(&parts)
        .ok_or_else(|| CodecError::Missing("AAS document part in package".to_string()))?;
    let mut document = decode_auto(&parts[&origin_part])?;

    if let Some(thumbnail) = document.environment.shell.thumbnail.as_mut() {
        let path = normalize_part_path(&thumbnail.path);
        if let Some(data) = parts.get(&path) {
            thumbnail.data.clone_from(data);
        }
    }

    let attachments: BTreeMap<String, Vec<u8>> = parts
        .into_iter()
        .filter(|(path, _)| is_attachment(path))
        .collect();

    tracing::debug!(
        origin = %origin_part,
        attachments = attachments.len(),
        "Read AASX package"
    );

    Ok(AasxPackage {
        document,
        origin_part,
        attachments,
    })
}

fn is_attachment(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    !(lower.ends_with(".xml")
        || lower.ends_with(".json")
        || lower.ends_with(".rels")
        || lower == ORIGIN_PART)
}

/// Find the AAS document: the origin relationship target, then any XML part
/// in an AAS namespace, then a JSON model.
fn locate_document(parts: &BTreeMap<String, Vec<u8>>) -> Option<String> {
    if let Some(target) = parts
        .get(ORIGIN_RELS_PART)
        .and_then(|rels| relationship_targets(rels, relationship::AAS_SPEC, "/aasx").ok())
        .and_then(|targets| targets.into_iter().find(|t| parts.contains_key(t)))
    {
        return Some(target);
    }

    let xml = parts.iter().find(|(path, content)| {
        path.to_ascii_lowercase().ends_with(".xml")
            && path.as_str() != CONTENT_TYPES_PART
            && String::from_utf8_lossy(content).contains("admin-shell.io/aas")
    });
    if let Some((path, _)) = xml {
        return Some(path.clone());
    }

    parts
        .iter()
        .find(|(path, content)| {
            path.ends_with(".json")
                && (path.ends_with("model.json")
                    || String::from_utf8_lossy(content).contains("assetAdministrationShells"))
        })
        .map(|(path, _)| path.clone())
}

/// Targets of relationships of the given type, resolved against `base`.
fn relationship_targets(
    rels: &[u8],
    rel_type: &str,
    base: &str,
) -> Result<Vec<String>, CodecError> {
    let root = dom::parse(rels)?;
    Ok(root
        .children_named("Relationship")
        .filter(|r| r.attr("Type") == Some(rel_type))
        .filter_map(|r| r.attr("Target"))
        .map(|target| {
            if target.starts_with('/') {
                normalize_part_path(target)
            } else {
                normalize_part_path(&format!("{base}/{target}"))
            }
        })
        .map(|target| decode_part_name(&target).unwrap_or(target))
        .collect())
}

/// Write an AASX package.
///
/// Inline `fileData` of File elements is stored in the package and the
/// element's value is rewritten to the stored part path. `attachments`
/// adds further parts keyed by path.
///
/// # Errors
///
/// Returns error if encoding or archive writing fails.
pub fn write_aasx(
    env: &Environment,
    concepts: &[ConceptDescription],
    attachments: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>, CodecError> {
    let mut env = env.clone();
    let mut files: BTreeMap<String, Vec<u8>> = attachments
        .iter()
        .map(|(path, data)| (normalize_part_path(path), data.clone()))
        .collect();
    for submodel in &mut env.submodels {
        extract_file_data(&mut submodel.elements, &mut files);
    }

    let thumbnail = env
        .shell
        .thumbnail
        .as_mut()
        .filter(|t| !t.data.is_empty())
        .map(|t| {
            if t.path.trim().is_empty() {
                t.path = format!("/aasx/thumbnail.{}", extension_for_mime(&t.content_type));
            }
            t.path = normalize_part_path(&t.path);
            (t.path.clone(), t.data.clone())
        });

    let xml = crate::xml::encode_xml(&env, concepts)?;
    let json = crate::json::encode_json(&env, concepts)?;

    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut put = |path: &str, data: &[u8]| -> Result<(), CodecError> {
        // The content types part name is reserved and stored verbatim.
        let name = if path == CONTENT_TYPES_PART {
            path.to_string()
        } else {
            encode_part_name(path)
        };
        zip.start_file(name.trim_start_matches('/'), options)
            .map_err(|e| CodecError::archive(format!("failed to create {path}: {e}")))?;
        zip.write_all(data)
            .map_err(|e| CodecError::archive(format!("failed to write {path}: {e}")))
    };

    put(
        CONTENT_TYPES_PART,
        content_types(files.keys().chain(thumbnail.iter().map(|(p, _)| p))).as_bytes(),
    )?;
    put(
        "/_rels/.rels",
        root_relationships(thumbnail.as_ref().map(|(p, _)| p.as_str())).as_bytes(),
    )?;
    put(ORIGIN_PART, b"Intentionally empty.")?;
    put(
        ORIGIN_RELS_PART,
        relationships(&[(relationship::AAS_SPEC, XML_PART)]).as_bytes(),
    )?;
    put(XML_PART, xml.as_bytes())?;
    let suppl: Vec<(&str, &str)> = files
        .keys()
        .map(|path| (relationship::AAS_SUPPL, path.as_str()))
        .collect();
    put(XML_RELS_PART, relationships(&suppl).as_bytes())?;
    put(JSON_PART, json.as_bytes())?;
    put(CORE_PART, core_properties(&env).as_bytes())?;
    for (path, data) in &files {
        put(path, data)?;
    }
    if let Some((path, data)) = &thumbnail {
        if !files.contains_key(path) {
            put(path, data)?;
        }
    }

    zip.finish()
        .map_err(|e| CodecError::archive(format!("failed to finalize package: {e}")))?;
    tracing::debug!(attachments = files.len(), "Wrote AASX package");
    Ok(buffer.into_inner())
}

/// Move pending inline attachments into `files`, pointing each element at
/// its stored part.
fn extract_file_data(elements: &mut [SubmodelElement], files: &mut BTreeMap<String, Vec<u8>>) {
    for element in elements {
        match &mut element.content {
            ElementContent::File {
                value,
                content_type,
                file_data,
            } => {
                if let Some(data) = file_data.take() {
                    let path = if value.trim().is_empty() || value.contains("://") {
                        unique_file_part(&data.file_name, files)
                    } else {
                        normalize_part_path(value)
                    };
                    *value = path.clone();
                    if !data.mime_type.is_empty() {
                        *content_type = Some(data.mime_type);
                    }
                    files.insert(path, data.bytes);
                }
            }
            ElementContent::Collection { children } | ElementContent::List { children } => {
                extract_file_data(children, files);
            }
            ElementContent::Entity { statements, .. } => extract_file_data(statements, files),
            ElementContent::AnnotatedRelationship { annotations, .. } => {
                extract_file_data(annotations, files);
            }
            ElementContent::Operation {
                input,
                output,
                inoutput,
            } => {
                extract_file_data(input, files);
                extract_file_data(output, files);
                extract_file_data(inoutput, files);
            }
            _ => {}
        }
    }
}

/// Free part path under the files directory for an attachment name. Only
/// the last path segment is used; a taken path gets `-1`, `-2`, ... before
/// the extension.
fn unique_file_part(file_name: &str, files: &BTreeMap<String, Vec<u8>>) -> String {
    let name = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("attachment");
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };

    let mut path = format!("{FILES_DIR}/{name}");
    let mut suffix = 1;
    while files.contains_key(&path) {
        path = format!("{FILES_DIR}/{stem}-{suffix}{ext}");
        suffix += 1;
    }
    path
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "zip" => "application/zip",
        "step" | "stp" => "application/step",
        _ => "application/octet-stream",
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        _ => "png",
    }
}

fn content_types<'a>(paths: impl Iterator<Item = &'a String>) -> String {
    let mut defaults = BTreeMap::from([
        ("json".to_string(), "application/json"),
        (
            "rels".to_string(),
            "application/vnd.openxmlformats-package.relationships+xml",
        ),
        ("xml".to_string(), "text/xml"),
    ]);
    for ext in paths.filter_map(|p| extension_of(p)) {
        defaults
            .entry(ext.clone())
            .or_insert_with(|| mime_for_extension(&ext));
    }

    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n",
    );
    for (ext, mime) in &defaults {
        out.push_str(&format!(
            "  <Default Extension=\"{}\" ContentType=\"{mime}\"/>\n",
            escape(ext.as_str())
        ));
    }
    out.push_str(&format!(
        "  <Override PartName=\"{ORIGIN_PART}\" ContentType=\"text/plain\"/>\n\
         \x20 <Override PartName=\"{CORE_PART}\" \
         ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\n\
         </Types>\n"
    ));
    out
}

fn relationships(entries: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
    );
    for (index, (rel_type, target)) in entries.iter().enumerate() {
        out.push_str(&format!(
            "  <Relationship Type=\"{rel_type}\" Target=\"{}\" Id=\"R{}\"/>\n",
            escape(encode_part_name(target).as_str()),
            index + 1
        ));
    }
    out.push_str("</Relationships>\n");
    out
}

fn root_relationships(thumbnail: Option<&str>) -> String {
    let mut entries = vec![
        (relationship::AASX_ORIGIN, ORIGIN_PART),
        (relationship::CORE_PROPERTIES, CORE_PART),
    ];
    if let Some(path) = thumbnail {
        entries.push((relationship::THUMBNAIL, path));
    }
    relationships(&entries)
}

fn core_properties(env: &Environment) -> String {
    let created = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let title = if env.shell.id_short.is_empty() {
        "AAS package"
    } else {
        env.shell.id_short.as_str()
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         \x20 <dc:title>{}</dc:title>\n\
         \x20 <dc:creator>aas-forge</dc:creator>\n\
         \x20 <dcterms:created xsi:type=\"dcterms:W3CDTF\">{created}</dcterms:created>\n\
         </cp:coreProperties>\n",
        escape(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aas_forge_core::{FileData, Shell, Submodel, Thumbnail};

    fn sample() -> Environment {
        let mut manual = SubmodelElement::file("Manual", "");
        manual.content = ElementContent::File {
            value: String::new(),
            content_type: None,
            file_data: Some(FileData {
                bytes: b"%PDF-1.7".to_vec(),
                mime_type: "application/pdf".to_string(),
                file_name: "Operating Manual.pdf".to_string(),
            }),
        };
        let mut sm = Submodel::new("Documentation", "https://ex/sm/doc");
        sm.elements.push(manual);
        let mut shell = Shell::new("Motor1", "https://ex/aas/1");
        shell.thumbnail = Some(Thumbnail {
            path: String::new(),
            content_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        });
        Environment::new(shell, vec![sm])
    }

    #[test]
    fn written_package_reads_back() {
        let bytes = write_aasx(&sample(), &[], &BTreeMap::new()).unwrap();
        let package = read_aasx(&bytes).unwrap();

        assert_eq!(package.origin_part, XML_PART);
        assert_eq!(
            package.attachment("aasx/files/Operating Manual.pdf"),
            Some(&b"%PDF-1.7"[..])
        );
        assert_eq!(
            package.attachment("/aasx/files/Operating%20Manual.pdf"),
            Some(&b"%PDF-1.7"[..])
        );

        let shell = &package.document.environment.shell;
        let thumbnail = shell.thumbnail.as_ref().unwrap();
        assert_eq!(thumbnail.path, "/aasx/thumbnail.png");
        assert_eq!(thumbnail.data, vec![0x89, b'P', b'N', b'G']);

        let manual = &package.document.environment.submodels[0].elements[0];
        assert_eq!(
            manual.content,
            ElementContent::File {
                value: "/aasx/files/Operating Manual.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                file_data: None,
            }
        );
    }

    fn pending_file(id_short: &str, file_name: &str, bytes: &[u8]) -> SubmodelElement {
        let mut element = SubmodelElement::file(id_short, "");
        element.content = ElementContent::File {
            value: String::new(),
            content_type: None,
            file_data: Some(FileData {
                bytes: bytes.to_vec(),
                mime_type: "application/pdf".to_string(),
                file_name: file_name.to_string(),
            }),
        };
        element
    }

    #[test]
    fn same_named_attachments_get_distinct_parts() {
        let mut sm = Submodel::new("Documentation", "https://ex/sm/doc");
        sm.elements.push(pending_file("First", "a.pdf", b"first"));
        sm.elements.push(pending_file("Second", "a.pdf", b"second"));
        let env = Environment::new(Shell::new("Motor1", "https://ex/aas/1"), vec![sm]);

        let package = read_aasx(&write_aasx(&env, &[], &BTreeMap::new()).unwrap()).unwrap();
        let values: Vec<String> = package.document.environment.submodels[0]
            .elements
            .iter()
            .map(|e| match &e.content {
                ElementContent::File { value, .. } => value.clone(),
                other => panic!("unexpected content {other:?}"),
            })
            .collect();
        assert_eq!(values, ["/aasx/files/a.pdf", "/aasx/files/a-1.pdf"]);
        assert_eq!(package.attachment(&values[0]), Some(&b"first"[..]));
        assert_eq!(package.attachment(&values[1]), Some(&b"second"[..]));
    }

    #[test]
    fn attachment_names_cannot_leave_the_files_directory() {
        let mut files = BTreeMap::new();
        assert_eq!(
            unique_file_part("../../etc/passwd", &files),
            "/aasx/files/passwd"
        );
        assert_eq!(unique_file_part("dir\\m.pdf", &files), "/aasx/files/m.pdf");
        assert_eq!(unique_file_part("..", &files), "/aasx/files/attachment");

        files.insert("/aasx/files/README".to_string(), Vec::new());
        assert_eq!(unique_file_part("README", &files), "/aasx/files/README-1");
    }

    #[test]
    fn package_without_document_is_rejected() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            zip.start_file("readme.txt", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        let err = read_aasx(&buffer.into_inner()).unwrap_err();
        assert!(matches!(err, CodecError::Missing(_)));
    }

    #[test]
    fn garbage_is_an_archive_error() {
        assert!(matches!(
            read_aasx(b"not a zip"),
            Err(CodecError::Archive(_))
        ));
    }

    #[test]
    fn content_types_cover_attachment_extensions() {
        let paths = ["/aasx/files/a.pdf".to_string(), "/aasx/t.PNG".to_string()];
        let types = content_types(paths.iter());
        assert!(types.contains("Extension=\"pdf\" ContentType=\"application/pdf\""));
        assert!(types.contains("Extension=\"png\" ContentType=\"image/png\""));
    }
}
