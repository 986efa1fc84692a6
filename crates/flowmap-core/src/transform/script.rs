//! Embedded script wrapper and the block-literal rewrite.
//!
//! A script transform is stored in the document as `js(<body>)`. Serialized
//! on a single line it reads `transform: "js(line one\nline two)"`, which is
//! unreadable for anything but one-liners, so after a whole document has
//! been serialized every line whose value is such a scalar is rewritten
//! into a YAML block literal that reads back as the same string:
//!
//! ```text
//! transform: |-
//!   js(line one
//!   line two)
//! ```

/// Opening marker of an embedded script.
pub const SCRIPT_OPEN: &str = "js(";

/// Closing marker of an embedded script.
pub const SCRIPT_CLOSE: &str = ")";

/// Default extra indentation of block literal lines.
pub const DEFAULT_INDENT: usize = 2;

/// Wraps a script body in the reserved markers.
pub fn wrap(body: &str) -> String {
    format!("{SCRIPT_OPEN}{body}{SCRIPT_CLOSE}")
}

/// Returns the body of a wrapped script, or `None` if `text` is not one.
///
/// Trailing whitespace is ignored so the newline a block literal keeps does
/// not break the match.
pub fn unwrap(text: &str) -> Option<&str> {
    text.trim_end()
        .strip_prefix(SCRIPT_OPEN)?
        .strip_suffix(SCRIPT_CLOSE)
}

/// Returns whether `text` is a wrapped script.
pub fn is_wrapped(text: &str) -> bool {
    unwrap(text).is_some()
}

/// Rewrites every quoted single-line script in `text` as a block literal.
///
/// Runs line by line over an already serialized document; see
/// [`expand_line`]. Lines that do not qualify are copied unchanged.
pub fn expand_blocks(text: &str, indent: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (content, newline) = match line.strip_suffix('\n') {
            Some(content) => (content, "\n"),
            None => (line, ""),
        };

        match expand_line(content, indent) {
            Some(block) => {
                out.push_str(&block);
                out.push_str(newline);
            }
            None => out.push_str(line),
        }
    }
    out
}

/// Rewrites one line whose value is a double-quoted wrapped script.
///
/// The quoted scalar must be the whole value of the line: it follows a
/// `key: ` or a sequence dash and runs to the end of the line. Everything
/// before the quote is kept, the scalar is replaced by the `|-` indicator,
/// and the unescaped script follows split on its newlines, indented to the
/// key's column plus `indent`. Returns `None` when the line does not
/// qualify or the script holds characters a block literal cannot carry.
pub fn expand_line(line: &str, indent: usize) -> Option<String> {
    let marker = format!("\"{SCRIPT_OPEN}");
    let start = line.find(&marker)?;
    let prefix = &line[..start];
    if !starts_value(prefix) {
        return None;
    }

    let script: String = serde_json::from_str(line[start..].trim_end()).ok()?;
    if !script.starts_with(SCRIPT_OPEN) || !script.ends_with(SCRIPT_CLOSE) {
        return None;
    }
    if !script.chars().all(fits_block) {
        return None;
    }

    let pad = " ".repeat(key_column(prefix) + indent);
    let mut block = format!("{prefix}|-");
    for script_line in script.split('\n') {
        block.push('\n');
        if !script_line.is_empty() {
            block.push_str(&pad);
            block.push_str(script_line);
        }
    }
    Some(block)
}

/// Returns whether a scalar starting right after `prefix` is a whole value.
fn starts_value(prefix: &str) -> bool {
    let mut rest = prefix.trim_start_matches(' ');
    while let Some(tail) = rest.strip_prefix("- ") {
        rest = tail.trim_start_matches(' ');
    }
    if rest.is_empty() {
        return true;
    }
    match rest.strip_suffix(": ") {
        Some(key) => !key.is_empty() && !key.contains([':', '"', '\'', '#']),
        None => false,
    }
}

/// Characters a literal block reproduces exactly.
fn fits_block(c: char) -> bool {
    match c {
        '\n' | '\t' => true,
        '\u{2028}' | '\u{2029}' | '\u{feff}' => false,
        _ => !c.is_control(),
    }
}

/// Column of the mapping key, counting sequence dashes as indentation.
fn key_column(prefix: &str) -> usize {
    let mut column = 0;
    let mut rest = prefix;
    loop {
        if let Some(tail) = rest.strip_prefix("- ") {
            column += 2;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix(' ') {
            column += 1;
            rest = tail;
        } else {
            return column;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap() {
        assert_eq!(wrap("return 1"), "js(return 1)");
        assert_eq!(unwrap("js(return 1)"), Some("return 1"));
        assert_eq!(unwrap("js(a\nb)\n"), Some("a\nb"));
        assert_eq!(unwrap(".input"), None);
        assert_eq!(unwrap("js(missing close"), None);
        assert!(is_wrapped("js()"));
    }

    #[test]
    fn test_expand_block() {
        let text = "states:\n- id: a\n  transform: \"js(const x = \\\"a\\\";\\nreturn x)\"\n  transition: b\n";
        let expected = "states:\n- id: a\n  transform: |-\n    js(const x = \"a\";\n    return x)\n  transition: b\n";
        assert_eq!(expand_blocks(text, 2), expected);
    }

    #[test]
    fn test_expand_block_after_sequence_dash() {
        let text = "- transform: \"js(a\\nb)\"";
        assert_eq!(expand_blocks(text, 2), "- transform: |-\n    js(a\n    b)");
    }

    #[test]
    fn test_expand_keeps_escaped_backslash_n() {
        let text = "x: \"js(a\\\\nb)\"\n";
        assert_eq!(expand_blocks(text, 2), "x: |-\n  js(a\\nb)\n");
    }

    #[test]
    fn test_expand_blank_lines_and_indent_unit() {
        let text = "    transform: \"js(a\\n\\n\\tb)\"\n";
        let expected = "    transform: |-\n        js(a\n\n        \tb)\n";
        assert_eq!(expand_blocks(text, 4), expected);
    }

    #[test]
    fn test_lines_without_marker_are_untouched() {
        let text = "a: 'js(x)'\nb: \"not js(\"\nc: plain\n";
        assert_eq!(expand_blocks(text, 2), text);
    }

    #[test]
    fn test_block_parses_back_to_wrapped_script() {
        let text = "transform: \"js(if (x) {\\n  return \\\"y\\\"\\n})\"\n";
        let expanded = expand_blocks(text, 2);
        let value: serde_json::Value = serde_yaml::from_str(&expanded).unwrap();
        let body = value["transform"].as_str().and_then(unwrap);
        assert_eq!(body, Some("if (x) {\n  return \"y\"\n}"));
    }

    #[test]
    fn test_marker_inside_other_scalars_is_untouched() {
        let text = concat!(
            "transform: .msg + \"js(x\"\n",
            "note: 'a: \"js(b)\"'\n",
            "pair: \"js(a)\" \"js(b)\"\n",
            "open: \"js(never closed\"\n",
        );
        assert_eq!(expand_blocks(text, 2), text);
    }

    #[test]
    fn test_carriage_return_stays_quoted() {
        let text = "transform: \"js(a\\r\\nb)\"\n";
        assert_eq!(expand_blocks(text, 2), text);

        let value: serde_json::Value = serde_yaml::from_str(text).unwrap();
        assert_eq!(value["transform"], "js(a\r\nb)");
    }

    #[test]
    fn test_block_keeps_exact_value() {
        let text = "- condition: \"js(return true)\"\n";
        let expanded = expand_blocks(text, 2);
        assert_eq!(expanded, "- condition: |-\n    js(return true)\n");

        let value: serde_json::Value = serde_yaml::from_str(&expanded).unwrap();
        assert_eq!(value[0]["condition"], "js(return true)");
    }
}
