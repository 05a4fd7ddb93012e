//! Help-text normalization utilities.

use regex::Regex;
use std::sync::LazyLock;

use super::Line;

/// Tab stop used when expanding tabs to spaces.
pub const TAB_WIDTH: usize = 8;

/// Strips terminal control sequences and folds line endings.
///
/// ANSI escapes and overstrike sequences (`X\bX` bold, `_\bX` underline)
/// are removed, CR/CRLF become LF, tabs are expanded to [`TAB_WIDTH`] and
/// trailing whitespace is trimmed. Line count and indentation are preserved
/// so that line indices stay meaningful for spans.
pub fn normalize_help_output(raw: &str) -> String {
    // SAFETY: These regexes are compile-time constants and are validated by tests.
    static ANSI_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex must compile"));
    static OVERSTRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".\x08").expect("static regex must compile"));

    let stripped = ANSI_RE.replace_all(raw, "");
    let mut cleaned = stripped.into_owned();
    while OVERSTRIKE_RE.is_match(&cleaned) {
        cleaned = OVERSTRIKE_RE.replace_all(&cleaned, "").into_owned();
    }
    let replaced = cleaned.replace("\r\n", "\n").replace('\r', "\n");

    replaced
        .lines()
        .map(|line| expand_tabs(line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_WIDTH - (column % TAB_WIDTH);
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

/// Splits normalized text into indexed lines with measured indentation.
pub fn to_lines(normalized: &str) -> Vec<Line> {
    normalized
        .lines()
        .enumerate()
        .map(|(index, raw)| {
            let text = raw.trim_start();
            Line {
                index,
                indent: raw.chars().count() - text.chars().count(),
                width: raw.chars().count(),
                text: text.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_ansi_and_overstrike() {
        let raw = "\x1b[1mUsage:\x1b[0m tool\nN\x08NA\x08AM\x08ME\x08E";
        assert_eq!(normalize_help_output(raw), "Usage: tool\nNAME");
    }

    #[test]
    fn test_folds_line_endings_and_trims() {
        assert_eq!(normalize_help_output("a  \r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_expands_tabs_to_stops() {
        assert_eq!(normalize_help_output("\t-v\tverbose"), "        -v      verbose");
    }

    #[test]
    fn test_lines_keep_indent() {
        let lines = to_lines("usage: x\n\n    -v  verbose");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[2].indent, 4);
        assert_eq!(lines[2].text, "-v  verbose");
        assert_eq!(lines[2].width, 15);
    }

    #[test]
    fn test_indent_counts_characters() {
        let lines = to_lines("\u{a0}\u{a0}-v  verbose");
        assert_eq!(lines[0].indent, 2);
        assert_eq!(lines[0].text, "-v  verbose");
    }
}
