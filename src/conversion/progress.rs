//! Progress extraction from raw transcoder output.
//!
//! The transcoder reports progress as free text (`Encoding: task 1 of 1, 12.34 %`),
//! so a chunk is scanned for the first decimal number and that number is taken
//! as the percentage. Chunks are scanned independently: a number split across
//! two reads matches in neither.

use std::sync::LazyLock;

use regex::Regex;

static PROGRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+").expect("progress pattern is valid"));

/// First substring of `chunk` that looks like a decimal number.
pub fn find_progress(chunk: &str) -> Option<&str> {
    PROGRESS_PATTERN.find(chunk).map(|m| m.as_str())
}

/// Parse the progress percentage out of one chunk of output bytes.
///
/// Only the bytes passed in are considered; invalid UTF-8 is replaced rather
/// than rejected.
pub fn parse_progress(chunk: &[u8]) -> Option<f64> {
    let text = String::from_utf8_lossy(chunk);
    find_progress(&text)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_handbrake_line() {
        let chunk = b"\rEncoding: task 1 of 1, 12.34 % (23.45 fps, avg 25.01 fps, ETA 00h12m03s)";
        assert_eq!(parse_progress(chunk), Some(12.34));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_progress(b"Encoding: task 1 of 1, 12 %"), None);
        assert_eq!(parse_progress(b""), None);
        assert_eq!(parse_progress(b"  . %"), None);
        assert_eq!(parse_progress(b"12."), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(find_progress("  55.10 % then 99.99"), Some("55.10"));
    }

    #[test]
    fn test_split_number_is_lost() {
        // "12.34" arriving as "12." + "34 %" is not recovered.
        assert_eq!(parse_progress(b"  12."), None);
        assert_eq!(parse_progress(b"34 %"), None);
    }

    #[test]
    fn test_invalid_utf8_tolerated() {
        let mut chunk = vec![0xff, 0xfe];
        chunk.extend_from_slice(b" 42.5 %");
        assert_eq!(parse_progress(&chunk), Some(42.5));
    }

    #[test]
    fn test_non_ascii_digits_ignored() {
        assert_eq!(find_progress("١٢.٣٤ then 7.5"), Some("7.5"));
    }

    proptest! {
        #[test]
        fn parsed_value_comes_from_the_chunk(chunk in "[ 0-9.%a-z]{0,40}") {
            if let Some(value) = parse_progress(chunk.as_bytes()) {
                let found = find_progress(&chunk).unwrap();
                prop_assert!(chunk.contains(found));
                prop_assert_eq!(found.parse::<f64>().unwrap(), value);
            } else {
                prop_assert!(find_progress(&chunk).is_none());
            }
        }
    }
}
