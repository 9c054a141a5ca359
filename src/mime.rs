//! MIME Registry (C2): load `mime.types`-style files into a sorted, binary-searchable
//! table, queried by file extension.
//!
//! Grounded on the C original's `findMimeType`/`initializeMimeTypes` (walk the file
//! char-by-char, first token per line is the media type, rest are extensions, sort by
//! extension, binary search). The C version rewrites the loaded buffer in place to
//! NUL-terminate tokens and keeps pointers into it; here each token is copied once into
//! an owned `Box<str>` instead, favoring owned/borrowed safe data over pointer
//! aliasing.

use std::fs;
use std::path::Path;

pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";
pub const XML_MIME_TYPE: &str = "application/xml; charset=utf-8";

#[derive(Debug, Clone)]
struct Entry {
    extension: Box<str>,
    media_type: Box<str>,
}

/// Read-only after construction; safe to share behind an `Arc` for the life of the
/// process (invariant 5).
#[derive(Debug, Default)]
pub struct MimeRegistry {
    entries: Vec<Entry>,
}

impl MimeRegistry {
    /// Load and parse `path`. Malformed or missing files are a startup error: the C
    /// original calls `exit(1)` if the mime file cannot be loaded, which we mirror by
    /// surfacing the io error to the caller (`main`) to decide how to terminate.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let mut tokens = line.split_whitespace();
            let media_type = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
            for ext in tokens {
                entries.push(Entry {
                    extension: ext.to_ascii_lowercase().into_boxed_str(),
                    media_type: media_type.into(),
                });
            }
        }
        entries.sort_by(|a, b| a.extension.cmp(&b.extension));
        MimeRegistry { entries }
    }

    /// `find_mime_type(path)`: walk back from the end of `path` to the last `.` before
    /// any `/`; the remainder is the candidate extension. Binary-search miss or no
    /// extension at all ⇒ the octet-stream sentinel.
    pub fn find_mime_type(&self, path: Option<&str>) -> &str {
        let path = match path {
            Some(p) => p,
            None => return UNKNOWN_MIME_TYPE,
        };
        let ext = match Self::extension_of(path) {
            Some(e) => e,
            None => return UNKNOWN_MIME_TYPE,
        };
        let needle = ext.to_ascii_lowercase();
        match self.entries.binary_search_by(|e| e.extension.as_ref().cmp(needle.as_str())) {
            Ok(idx) => &self.entries[idx].media_type,
            Err(_) => UNKNOWN_MIME_TYPE,
        }
    }

    fn extension_of(path: &str) -> Option<&str> {
        let bytes = path.as_bytes();
        let mut i = bytes.len();
        while i > 0 {
            i -= 1;
            match bytes[i] {
                b'/' => return None,
                b'.' => return Some(&path[i + 1..]),
                _ => {},
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment line
text/html html htm
application/octet-stream bin
image/jpeg jpeg jpg
";

    #[test]
    fn known_extension_round_trips() {
        let reg = MimeRegistry::parse(SAMPLE);
        assert_eq!(reg.find_mime_type(Some("/a/b/c.jpg")), "image/jpeg");
        assert_eq!(reg.find_mime_type(Some("/a/b/c.htm")), "text/html");
    }

    #[test]
    fn unknown_extension_is_sentinel() {
        let reg = MimeRegistry::parse(SAMPLE);
        assert_eq!(reg.find_mime_type(Some("/a/b/c.unknownext")), UNKNOWN_MIME_TYPE);
    }

    #[test]
    fn no_extension_is_sentinel() {
        let reg = MimeRegistry::parse(SAMPLE);
        assert_eq!(reg.find_mime_type(Some("/a/b/README")), UNKNOWN_MIME_TYPE);
        assert_eq!(reg.find_mime_type(Some("/a.dir/README")), UNKNOWN_MIME_TYPE);
    }

    #[test]
    fn null_path_is_sentinel() {
        let reg = MimeRegistry::parse(SAMPLE);
        assert_eq!(reg.find_mime_type(None), UNKNOWN_MIME_TYPE);
    }

    #[test]
    fn comments_are_ignored() {
        let reg = MimeRegistry::parse(SAMPLE);
        assert_eq!(reg.find_mime_type(Some("c.bin")), "application/octet-stream");
    }
}
