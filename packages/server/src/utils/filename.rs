use chrono::{DateTime, Utc};

/// Reasons an uploaded filename is refused.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only after stripping directories.
    Empty,
    /// Filename is `.` or `..`.
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
}

impl FilenameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::PathTraversal => "Invalid filename: '.' and '..' are not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
        }
    }
}

/// Reduces a client-supplied filename to its last path component and validates it.
///
/// Browsers on Windows may send `C:\Users\me\photo.png`; only `photo.png` is kept.
pub fn sanitize_upload_name(raw: &str) -> Result<String, FilenameError> {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw);
    let trimmed = base.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // CRLF would otherwise end up in Content-Disposition.
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed == "." || trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    Ok(trimmed.to_string())
}

/// Name the compressed blob is stored under.
pub fn compressed_name(original: &str, at: DateTime<Utc>) -> String {
    format!("{}_compressed_{original}", at.timestamp_millis())
}

/// Splits `name` into stem and extension. `None` when there is no usable extension.
pub fn extract_stem(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}

/// Filename offered to the client when downloading a blob of `stored_type`.
///
/// When the image encoder changed the format (PNG in, JPEG out) the original
/// extension would lie about the content, so it is swapped for `.jpg`.
pub fn download_filename(original: &str, stored_type: &str) -> String {
    if stored_type != "image/jpeg" {
        return original.to_string();
    }

    let already_jpeg = mime_guess::from_path(original)
        .iter()
        .any(|m| m.essence_str() == stored_type);
    if already_jpeg {
        return original.to_string();
    }

    match extract_stem(original) {
        Some((stem, _)) => format!("{stem}.jpg"),
        None => format!("{original}.jpg"),
    }
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987 `filename*`.
pub fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
