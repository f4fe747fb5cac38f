//! Content-type helpers for uploaded media.

/// Fallback content type for payloads with no usable type information.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guess the MIME type from a file name's extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Pick the content type to store for an upload.
///
/// A declared type wins when it is non-blank; otherwise the file name is
/// consulted, and finally [`DEFAULT_CONTENT_TYPE`] is used.
pub fn effective_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => file_name
            .map(guess_content_type)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guessing() {
        assert_eq!(guess_content_type("movie.mkv"), "video/x-matroska");
        assert_eq!(guess_content_type("movie.MP4"), "video/mp4");
        assert_eq!(guess_content_type("clip.webm"), "video/webm");
        assert_eq!(guess_content_type("song.mp3"), "audio/mpeg");
        assert_eq!(guess_content_type("file.xyz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess_content_type("noext"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn declared_type_wins() {
        assert_eq!(
            effective_content_type(Some("video/webm"), Some("movie.mp4")),
            "video/webm"
        );
    }

    #[test]
    fn blank_declared_type_falls_back() {
        assert_eq!(effective_content_type(Some("  "), Some("movie.mp4")), "video/mp4");
        assert_eq!(effective_content_type(None, None), DEFAULT_CONTENT_TYPE);
        assert_eq!(effective_content_type(Some(""), None), DEFAULT_CONTENT_TYPE);
    }
}
