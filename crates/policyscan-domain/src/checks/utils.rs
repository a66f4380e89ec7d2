use policyscan_types::Range;
use regex::Regex;

/// Range of the first line containing `needle`, spanning the needle.
pub fn find_first_literal(text: &str, needle: &str) -> Option<Range> {
    text.split('\n').enumerate().find_map(|(i, line)| {
        line.find(needle)
            .map(|start| line_range(i, line, start, start + needle.len()))
    })
}

/// One range per line whose text matches `pattern` (first match on each line).
pub fn find_match_ranges(text: &str, pattern: &Regex) -> Vec<Range> {
    text.split('\n')
        .enumerate()
        .filter_map(|(i, line)| {
            pattern
                .find(line)
                .map(|m| line_range(i, line, m.start(), m.end()))
        })
        .collect()
}

fn line_range(line_no: usize, line: &str, start: usize, end: usize) -> Range {
    let line_no = line_no as u32;
    Range::new(
        line_no,
        char_col(line, start),
        line_no,
        char_col(line, end),
    )
}

/// Byte index within `line` to a character column.
fn char_col(line: &str, byte_idx: usize) -> u32 {
    line[..byte_idx].chars().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_first_literal_reports_character_columns() {
        let text = "{\n  \"é\": 1,\n  \"dep\": \"1\"\n}";
        assert_eq!(
            find_first_literal(text, "\"dep\""),
            Some(Range::new(2, 2, 2, 7))
        );
        assert_eq!(find_first_literal(text, "\"é\""), Some(Range::new(1, 2, 1, 5)));
        assert_eq!(find_first_literal(text, "missing"), None);
    }

    #[test]
    fn find_match_ranges_is_per_line_anchored() {
        let re = Regex::new("^go:").expect("regex");
        let text = "language: go\ngo:\n  - 1.x\n  go: nested\ngo:";
        assert_eq!(
            find_match_ranges(text, &re),
            vec![Range::new(1, 0, 1, 3), Range::new(4, 0, 4, 3)]
        );
    }
}
