//! PGN utilities: lightweight regex-based movetext extraction.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}|;[^\n]*").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"O-O-O|O-O|0-0-0|0-0|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?[+#]?").unwrap()
});

/// True when the text carries a tag section or a first move number.
pub fn has_pgn_marker(text: &str) -> bool {
    text.contains("[Event") || text.contains("1.")
}

/// Extract mainline SAN tokens (headers, comments and variations removed).
///
/// Tokens are returned as written; whether they are legal is decided at
/// replay time.
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_comments = COMMENT_RE.replace_all(pgn, " ");
    let no_headers = HEADER_RE.replace_all(&no_comments, " ");
    let mainline = strip_variations(&no_headers);

    MOVE_RE
        .find_iter(&mainline)
        .map(|m| match m.as_str() {
            "0-0" => "O-O".to_string(),
            "0-0-0" => "O-O-O".to_string(),
            san => san.to_string(),
        })
        .collect()
}

/// Remove parenthesised variations, including nested ones.
fn strip_variations(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Extract a string value from a PGN header (e.g. Result, White).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_moves_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0"#;

        let moves = extract_moves(pgn);
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
    }

    #[test]
    fn test_extract_moves_skips_comments_and_variations() {
        let pgn = "1. e4 { [%clk 0:03:00] } 1... c5 (1... e5 2. Nf3 (2. f4 exf4)) 2. Nf3 $1 d6?! ; line comment Qxd8\n3. d4 *";
        assert_eq!(extract_moves(pgn), vec!["e4", "c5", "Nf3", "d6", "d4"]);
    }

    #[test]
    fn test_extract_moves_castling_and_promotion() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 Nf6 5. d3 O-O 6. a4 a5 7. b8=Q+";
        let moves = extract_moves(pgn);
        assert_eq!(moves[6], "O-O");
        assert_eq!(moves[9], "O-O");
        assert_eq!(moves.last().map(String::as_str), Some("b8=Q+"));
    }

    #[test]
    fn test_has_pgn_marker() {
        assert!(has_pgn_marker("[Event \"Live Chess\"]"));
        assert!(has_pgn_marker("1. e4 e5"));
        assert!(!has_pgn_marker("<html>not found</html>"));
        assert!(!has_pgn_marker(""));
    }

    #[test]
    fn test_extract_header() {
        let pgn = r#"[White "Magnus"]
[Black ""]"#;
        assert_eq!(extract_header(pgn, "White").as_deref(), Some("Magnus"));
        assert_eq!(extract_header(pgn, "Black"), None);
        assert_eq!(extract_header(pgn, "Missing"), None);
    }
}
