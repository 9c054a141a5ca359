//! Path canonicalization helpers shared by every verb: trailing-slash normalization
//! (invariant 4), the display name used in directory listings, and human-readable file
//! sizing for the `GET` directory index (§4.6).
//!
//! Follows `webpath.rs`'s/`davpath.rs`'s canonical path representation and
//! percent-encoding of hrefs, and the original daemon's `normalizeDirName`/
//! `formatFileSize`.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded in an href, beyond the baseline control set.
/// Matches `davpath.rs`'s path-encode set: reserve everything that isn't a normal path
/// character.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Ensure `path` carries a trailing `/` iff `is_dir` (invariant 4 / C original's
/// `normalizeDirName`).
pub fn with_trailing_slash(path: &str, is_dir: bool) -> Cow<'_, str> {
    if is_dir && !path.ends_with('/') {
        Cow::Owned(format!("{path}/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// The last path segment, used as the "is this a dotfile" check for
/// `Win32FileAttributes` and the HTML directory listing.
pub fn display_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn percent_encode_href(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// `.` and `..` are always filtered from directory iteration; other dotfiles are kept.
/// A name is `.` or `..` iff it is `.` followed by at most one further `.`.
pub fn is_dot_or_dotdot(name: &str) -> bool {
    name == "." || name == ".."
}

const SUFFIXES: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Human-readable size, base-1024. Ports the C original's `formatFileSize`, with the
/// `"PiB" "EiB"` string-literal concatenation bug (which collapsed two suffixes into
/// one) fixed rather than reproduced — see SPEC_FULL.md §9.
pub fn format_file_size(size: u64) -> String {
    let mut magnitude = 0usize;
    let mut shifted = size;
    while magnitude < SUFFIXES.len() - 1 && shifted >= 1024 {
        magnitude += 1;
        shifted >>= 10;
    }

    if magnitude == 0 {
        return format!("{size} {}", SUFFIXES[0]);
    }

    let divisor = (1u64 << (magnitude * 10)) as f64;
    let scaled = size as f64 / divisor;
    let formatted = if shifted >= 100 {
        format!("{scaled:.0}")
    } else if shifted >= 10 {
        format!("{scaled:.1}")
    } else {
        format!("{scaled:.2}")
    };
    format!("{formatted} {}", SUFFIXES[magnitude])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_added_only_for_directories() {
        assert_eq!(with_trailing_slash("/srv/x", true), "/srv/x/");
        assert_eq!(with_trailing_slash("/srv/x/", true), "/srv/x/");
        assert_eq!(with_trailing_slash("/srv/x", false), "/srv/x");
    }

    #[test]
    fn display_name_is_last_segment() {
        assert_eq!(display_name("/srv/x/a.txt"), "a.txt");
        assert_eq!(display_name("/srv/x/d/"), "d");
        assert_eq!(display_name("/"), "");
    }

    #[test]
    fn dot_entries_are_filtered_other_dotfiles_are_not() {
        assert!(is_dot_or_dotdot("."));
        assert!(is_dot_or_dotdot(".."));
        assert!(!is_dot_or_dotdot(".hidden"));
        assert!(!is_dot_or_dotdot("..bak"));
    }

    #[test]
    fn size_formatting_below_1024_has_no_fraction() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
    }

    #[test]
    fn size_formatting_uses_two_decimals_below_ten() {
        assert_eq!(format_file_size(1024 * 5), "5.00 KiB");
    }

    #[test]
    fn size_formatting_uses_one_decimal_between_ten_and_hundred() {
        assert_eq!(format_file_size(1024 * 42), "42.0 KiB");
    }

    #[test]
    fn size_formatting_uses_zero_decimals_at_or_above_hundred() {
        assert_eq!(format_file_size(1024 * 256), "256 KiB");
    }

    #[test]
    fn size_formatting_is_monotone_within_a_suffix() {
        let a = format_file_size(1024 * 1024 * 10);
        let b = format_file_size(1024 * 1024 * 20);
        assert_ne!(a, b);
    }
}
