/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace em and en dashes with a plain hyphen.
pub fn strip_dashes(text: &str) -> String {
    text.replace(['\u{2014}', '\u{2013}'], "-")
}

/// First `max` characters of `text`.
pub fn char_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lines with surrounding whitespace removed, skipping blank ones.
pub fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Senior\n\tEngineer   at  Acme \r\n"), "Senior Engineer at Acme");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn test_strip_dashes_replaces_each_dash_with_one_hyphen() {
        let input = "Built tools \u{2014} fast \u{2013} and shipped 2019\u{2013}2021";
        let output = strip_dashes(input);
        assert!(!output.contains('\u{2014}'));
        assert!(!output.contains('\u{2013}'));
        assert_eq!(output, "Built tools - fast - and shipped 2019-2021");
        assert_eq!(
            output.matches('-').count(),
            input.matches(['\u{2014}', '\u{2013}']).count()
        );
    }

    #[test]
    fn test_char_prefix_respects_char_boundaries() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("abc", 0), "");
    }

    #[test]
    fn test_non_empty_lines_skips_blanks() {
        let lines: Vec<_> = non_empty_lines("\n  Jane Doe \n\n jane@x.com\n").collect();
        assert_eq!(lines, vec!["Jane Doe", "jane@x.com"]);
    }
}
