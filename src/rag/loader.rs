//! File loaders for the ingestion path.
//!
//! Turns staged upload files into plain-text [`Document`]s:
//! - `.txt` / `.md` read as UTF-8 text
//! - `.docx` unpacked with `zip`, WordprocessingML tags stripped
//! - `.pdf` scanned for Flate-compressed content streams, text-showing
//!   operators extracted per page
//!
//! Unsupported or unreadable files are skipped and counted, never fatal:
//! the caller distinguishes "nothing loadable" from "some files failed".

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use uuid::Uuid;

/// A raw text document ready for chunking. Immutable once created;
/// re-ingestion supersedes it rather than merging.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Original filename, used as the citation source label.
    pub source: String,
    /// 1-based page number for paginated formats (PDF).
    pub page: Option<u32>,
    pub text: String,
}

/// An uploaded file staged on disk, paired with its original filename.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    /// Number of inputs skipped (unsupported type, unreadable, or empty).
    pub skipped: usize,
}

/// Load every supported file, skipping the rest.
pub fn load_documents(files: &[StagedFile]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for file in files {
        let extension = file
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let loaded = match extension.as_str() {
            "txt" | "md" => load_text(file),
            "docx" => load_docx(file),
            "pdf" => load_pdf(file),
            _ => {
                tracing::debug!("Skipping unsupported file type: {}", file.name);
                Vec::new()
            }
        };

        if loaded.is_empty() {
            outcome.skipped += 1;
        } else {
            outcome.documents.extend(loaded);
        }
    }

    outcome
}

fn load_text(file: &StagedFile) -> Vec<Document> {
    let bytes = match fs::read(&file.path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", file.name, err);
            return Vec::new();
        }
    };

    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.trim().is_empty() {
        return Vec::new();
    }

    vec![Document {
        id: Uuid::new_v4().to_string(),
        source: file.name.clone(),
        page: None,
        text,
    }]
}

fn load_docx(file: &StagedFile) -> Vec<Document> {
    let handle = match fs::File::open(&file.path) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::warn!("Failed to open {}: {}", file.name, err);
            return Vec::new();
        }
    };

    let mut archive = match zip::ZipArchive::new(handle) {
        Ok(archive) => archive,
        Err(err) => {
            tracing::warn!("{} is not a valid docx package: {}", file.name, err);
            return Vec::new();
        }
    };

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut entry) => {
            if let Err(err) = entry.read_to_string(&mut xml) {
                tracing::warn!("Failed to read document body of {}: {}", file.name, err);
                return Vec::new();
            }
        }
        Err(err) => {
            tracing::warn!("{} has no document body: {}", file.name, err);
            return Vec::new();
        }
    }

    let text = wordprocessing_text(&xml);
    if text.trim().is_empty() {
        return Vec::new();
    }

    vec![Document {
        id: Uuid::new_v4().to_string(),
        source: file.name.clone(),
        page: None,
        text,
    }]
}

fn load_pdf(file: &StagedFile) -> Vec<Document> {
    let bytes = match fs::read(&file.path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", file.name, err);
            return Vec::new();
        }
    };

    extract_pdf_pages(&bytes)
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(idx, text)| Document {
            id: Uuid::new_v4().to_string(),
            source: file.name.clone(),
            page: Some(idx as u32 + 1),
            text,
        })
        .collect()
}

/// Extract plain text from WordprocessingML, paragraph tags becoming
/// newlines and tabs becoming spaces.
fn wordprocessing_text(xml: &str) -> String {
    let normalized = xml
        .replace("</w:p>", "</w:p>\n")
        .replace("<w:tab/>", " ")
        .replace("<w:br/>", "\n");

    let mut result = String::new();
    let mut in_tag = false;
    for c in normalized.chars() {
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }
    }

    let unescaped = result
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = unescaped
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    lines.join("\n")
}

/// Pull the text-showing operators out of each PDF content stream.
///
/// Handles unencrypted PDFs with plain or FlateDecode content streams;
/// each text-bearing stream is treated as one page, in file order.
fn extract_pdf_pages(bytes: &[u8]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find_bytes(bytes, cursor, b"stream") {
        let mut data_start = start + b"stream".len();
        if bytes.get(data_start) == Some(&b'\r') {
            data_start += 1;
        }
        if bytes.get(data_start) == Some(&b'\n') {
            data_start += 1;
        }

        let Some(data_end) = find_bytes(bytes, data_start, b"endstream") else {
            break;
        };
        cursor = data_end + b"endstream".len();

        let raw = trim_stream_tail(&bytes[data_start..data_end]);
        let content = inflate(raw).unwrap_or_else(|| raw.to_vec());

        let text = content_stream_text(&content);
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    pages
}

fn trim_stream_tail(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && (data[end - 1] == b'\n' || data[end - 1] == b'\r') {
        end -= 1;
    }
    &data[..end]
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) if !out.is_empty() => Some(out),
        _ => None,
    }
}

/// Collect literal strings inside BT..ET text objects, decoding the PDF
/// string escapes. Kerning arrays (TJ) contribute their string elements.
fn content_stream_text(content: &[u8]) -> String {
    let mut text = String::new();
    let mut in_text_object = false;
    let mut i = 0;

    while i < content.len() {
        if content[i..].starts_with(b"BT") {
            in_text_object = true;
            i += 2;
            continue;
        }
        if content[i..].starts_with(b"ET") {
            if in_text_object && !text.ends_with('\n') && !text.is_empty() {
                text.push('\n');
            }
            in_text_object = false;
            i += 2;
            continue;
        }

        if in_text_object && content[i] == b'(' {
            let (literal, next) = parse_pdf_string(content, i + 1);
            text.push_str(&literal);
            i = next;
            continue;
        }

        i += 1;
    }

    text
}

fn parse_pdf_string(content: &[u8], mut i: usize) -> (String, usize) {
    let mut out = String::new();
    let mut depth = 1;

    while i < content.len() {
        match content[i] {
            b'\\' if i + 1 < content.len() => {
                let escaped = content[i + 1];
                match escaped {
                    b'n' => out.push('\n'),
                    b'r' => out.push('\r'),
                    b't' => out.push('\t'),
                    b'(' => out.push('('),
                    b')' => out.push(')'),
                    b'\\' => out.push('\\'),
                    b'0'..=b'7' => {
                        let mut code = 0u32;
                        let mut n = 0;
                        while n < 3 && i + 1 + n < content.len() {
                            let digit = content[i + 1 + n];
                            if !(b'0'..=b'7').contains(&digit) {
                                break;
                            }
                            code = code * 8 + (digit - b'0') as u32;
                            n += 1;
                        }
                        if let Some(c) = char::from_u32(code) {
                            out.push(c);
                        }
                        i += n + 1;
                        continue;
                    }
                    _ => out.push(escaped as char),
                }
                i += 2;
            }
            b'(' => {
                depth += 1;
                out.push('(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    break;
                }
                out.push(')');
            }
            byte => {
                out.push(byte as char);
                i += 1;
            }
        }
    }

    (out, i)
}

fn find_bytes(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
