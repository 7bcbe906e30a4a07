// codesift - core/extract.rs
//
// Candidate extraction: one raw line in, at most one token out.
// Pure function, no allocation.

use crate::core::model::LengthWindow;

/// Trim `line` and accept it if its length in characters lies within `window`.
///
/// No normalisation beyond trimming: case, inner whitespace, and character
/// set are preserved verbatim.
pub fn extract<'a>(line: &'a str, window: &LengthWindow) -> Option<&'a str> {
    let token = line.trim();

    // A char is at least one byte and at most four, so the byte length
    // bounds the char count from both sides.
    if token.len() < window.min() || token.len() > window.max().saturating_mul(4) {
        return None;
    }

    window.contains(token.chars().count()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> LengthWindow {
        LengthWindow::default()
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(extract("ABCDEFGH", &window()), Some("ABCDEFGH"));
        assert_eq!(extract("ABCDEFGHIJ", &window()), Some("ABCDEFGHIJ"));
        assert_eq!(extract("ABCDEFG", &window()), None);
        assert_eq!(extract("ABCDEFGHIJK", &window()), None);
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        assert_eq!(extract("  ABCDEFGH\t\r", &window()), Some("ABCDEFGH"));
        // Eleven after trimming is still too long.
        assert_eq!(extract(" ABCDEFGHIJK ", &window()), None);
        assert_eq!(extract("   ", &window()), None);
        assert_eq!(extract("", &window()), None);
    }

    #[test]
    fn test_preserves_case_and_inner_whitespace() {
        assert_eq!(extract("abc DEF gh", &window()), Some("abc DEF gh"));
        assert_eq!(extract("a-b_c.d!e", &window()), Some("a-b_c.d!e"));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Eight chars, sixteen bytes.
        let token = "éééééééé";
        assert_eq!(token.len(), 16);
        assert_eq!(extract(token, &window()), Some(token));

        // Seven chars, fourteen bytes.
        assert_eq!(extract("ééééééé", &window()), None);
    }

    #[test]
    fn test_custom_window() {
        let w = LengthWindow::new(3, 3).unwrap();
        assert_eq!(extract("abc", &w), Some("abc"));
        assert_eq!(extract("ab", &w), None);
        assert_eq!(extract("abcd", &w), None);
    }
}
