//! Mapping between identifiers, storage paths, served paths and content
//! headers.

use crate::codec::Suffix;
use crate::identifier::Identifier;
use mime_guess::mime;

/// Content type used when a request carries no suffix.
pub const DEFAULT_TEXT_TYPE: &str = "text/plain; charset=utf-8";
/// Content type for unregistered extensions and filename downloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

const MAX_FILENAME_BYTES: usize = 255;
const FALLBACK_FILENAME: &str = "download";
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Headers describing the body of a served object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHeaders {
    pub content_type: String,
    pub disposition: Option<String>,
}

/// Shards an identifier into `<date>/<check>/<payload>`.
pub fn storage_path(id: &Identifier) -> String {
    format!("{}/{}/{}", id.date_code(), id.check_code(), id.payload())
}

/// Path clients use to fetch an object: `/<id>.<ext>` when the suggested
/// filename has a registered extension, `/<id>` otherwise.
pub fn served_path(id: &Identifier, suggested_filename: Option<&str>) -> String {
    match suggested_filename.and_then(registered_extension) {
        Some(ext) => format!("/{id}.{ext}"),
        None => format!("/{id}"),
    }
}

/// Path that keeps a client-chosen filename after the identifier.
pub fn served_path_with_filename(id: &Identifier, filename: &str) -> String {
    format!("/{id}/{filename}")
}

/// Content headers negotiated from the suffix of a served path.
pub fn content_headers(suffix: Option<&Suffix>) -> ContentHeaders {
    match suffix {
        None => ContentHeaders {
            content_type: DEFAULT_TEXT_TYPE.to_string(),
            disposition: None,
        },
        Some(Suffix::Extension(ext)) => ContentHeaders {
            content_type: mime_for_extension(ext),
            disposition: None,
        },
        Some(Suffix::FileName(name)) => ContentHeaders {
            content_type: OCTET_STREAM.to_string(),
            disposition: Some(attachment_disposition(&sanitize_filename(name))),
        },
    }
}

fn mime_for_extension(ext: &str) -> String {
    match mime_guess::from_ext(ext).first() {
        Some(m) if m.type_() == mime::TEXT && m.get_param(mime::CHARSET).is_none() => {
            format!("{}; charset=utf-8", m.essence_str())
        }
        Some(m) => m.to_string(),
        None => OCTET_STREAM.to_string(),
    }
}

fn registered_extension(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    mime_guess::from_ext(ext).first().map(|_| ext)
}

fn attachment_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    if ascii == name {
        format!("attachment; filename=\"{name}\"")
    } else {
        format!(
            "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
            urlencoding::encode(name)
        )
    }
}

/// Turns a client-supplied filename into a safe download name.
///
/// Path separators, control characters and characters reserved on common
/// filesystems are removed, leading and trailing dots and spaces are trimmed
/// and the result is bounded to 255 bytes. Reserved device names get an
/// underscore prefix. An empty result becomes `download`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .filter(|c| !matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');

    let mut bounded = String::with_capacity(trimmed.len().min(MAX_FILENAME_BYTES));
    for c in trimmed.chars() {
        if bounded.len() + c.len_utf8() > MAX_FILENAME_BYTES {
            break;
        }
        bounded.push(c);
    }

    if bounded.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = bounded.split('.').next().unwrap_or_default();
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        bounded.insert(0, '_');
        if bounded.len() > MAX_FILENAME_BYTES {
            bounded.pop();
        }
    }

    bounded
}
