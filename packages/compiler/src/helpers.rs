//! Helper tag expansion.
//!
//! Runs once over the compiled output and rewrites `@name` / `@name(args)`
//! in literal text into `<%@ name(args) %>` tags. Tags already in the output
//! are copied untouched, as is the content of `<script>` and `<style>`.

use crate::error::{CompileError, CompileResult};

/// Rewrite helper invocations in the literal text of `compiled`
pub fn expand_helpers(compiled: &str) -> CompileResult<String> {
    let bytes = compiled.as_bytes();
    let mut output = String::with_capacity(compiled.len());
    let mut pos = 0;
    let mut copied = 0;

    while pos < bytes.len() {
        let rest = &compiled[pos..];

        if rest.starts_with("<%%") {
            pos += 3;
        } else if rest.starts_with("<%") {
            pos = tag_end(compiled, pos);
        } else if let Some(len) = raw_block_len(rest) {
            pos += len;
        } else if bytes[pos] == b'@' {
            if bytes.get(pos + 1) == Some(&b'@') && ident_len(&compiled[pos + 2..]) > 0 {
                // `@@name` prints as `@name`
                let name_end = pos + 2 + ident_len(&compiled[pos + 2..]);
                output.push_str(&compiled[copied..pos]);
                output.push('@');
                output.push_str(&compiled[pos + 2..name_end]);
                pos = name_end;
                copied = name_end;
                continue;
            }

            let preceded_by_word = pos > 0 && bytes[pos - 1].is_ascii_alphanumeric();
            let name_len = ident_len(&compiled[pos + 1..]);
            if preceded_by_word || name_len == 0 {
                pos += 1;
                continue;
            }

            let name = &compiled[pos + 1..pos + 1 + name_len];
            let mut end = pos + 1 + name_len;
            let args = if bytes.get(end) == Some(&b'(') {
                let close = matching_paren(compiled, end).ok_or_else(|| {
                    CompileError::UnbalancedHelperArguments {
                        name: name.to_string(),
                        pos,
                    }
                })?;
                let args = compiled[end + 1..close].trim();
                end = close + 1;
                args
            } else {
                ""
            };

            output.push_str(&compiled[copied..pos]);
            output.push_str(&format!("<%@ {}({}) %>", name, args));
            pos = end;
            copied = end;
        } else {
            pos += utf8_len(bytes[pos]);
        }
    }

    output.push_str(&compiled[copied..]);
    Ok(output)
}

/// Byte offset just past the `%>` closing the tag at `start`
fn tag_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = start + 2;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => pos = skip_string(bytes, pos, quote),
            b'%' if bytes.get(pos + 1) == Some(&b'>') => return pos + 2,
            _ => pos += 1,
        }
    }
    bytes.len()
}

const RAW_TAGS: [(&str, &str); 2] = [("<script", "</script>"), ("<style", "</style>")];

/// Length of a leading `<script>`/`<style>` element, content included.
/// A self-closed element is only as long as its opening tag.
fn raw_block_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }

    for (open, close) in RAW_TAGS {
        let is_open = rest
            .get(..open.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(open))
            && bytes
                .get(open.len())
                .is_some_and(|b| *b == b'>' || *b == b'/' || b.is_ascii_whitespace());
        if !is_open {
            continue;
        }

        let open_end = open_tag_end(bytes, open.len());
        if bytes[..open_end].ends_with(b"/>") {
            return Some(open_end);
        }

        let body = &rest[open_end..];
        return Some(match find_ignore_case(body, close) {
            Some(at) => open_end + at + close.len(),
            None => rest.len(),
        });
    }
    None
}

/// Offset just past the `>` ending an opening tag, skipping quoted values
fn open_tag_end(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => pos = skip_string(bytes, pos, quote),
            b'>' => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Index of the `)` matching the `(` at `open`, skipping quoted strings
fn matching_paren(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            quote @ (b'"' | b'\'') => {
                pos = skip_string(bytes, pos, quote);
                continue;
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Offset just past the string literal opened at `start`
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn ident_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !bytes.first().is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') {
        return 0;
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_bare_helper() {
        assert_eq!(expand_helpers("<head>@robots</head>").unwrap(), "<head><%@ robots() %></head>");
    }

    #[test]
    fn test_expands_helper_with_arguments() {
        assert_eq!(
            expand_helpers(r#"@description("A shop")"#).unwrap(),
            r#"<%@ description("A shop") %>"#
        );
    }

    #[test]
    fn test_keeps_nested_parentheses() {
        assert_eq!(
            expand_helpers(r#"@keywords("a", fn(1,2), "b")"#).unwrap(),
            r#"<%@ keywords("a", fn(1,2), "b") %>"#
        );
    }

    #[test]
    fn test_skips_parentheses_in_strings() {
        assert_eq!(
            expand_helpers(r#"@keywords(")", "(")!"#).unwrap(),
            r#"<%@ keywords(")", "(") %>!"#
        );
    }

    #[test]
    fn test_double_at_is_literal() {
        assert_eq!(expand_helpers("mail @@robots").unwrap(), "mail @robots");
    }

    #[test]
    fn test_email_addresses_are_untouched() {
        assert_eq!(
            expand_helpers("write to max@example.com").unwrap(),
            "write to max@example.com"
        );
    }

    #[test]
    fn test_ignores_tags() {
        let compiled = r#"<%= "@robots" %><% if (($a) ?? false) %>@x<% endif %>"#;
        assert_eq!(
            expand_helpers(compiled).unwrap(),
            r#"<%= "@robots" %><% if (($a) ?? false) %><%@ x() %><% endif %>"#
        );
    }

    #[test]
    fn test_ignores_style_blocks() {
        let compiled = "<style>@media print { a { color: red } }</style>@robots";
        assert_eq!(
            expand_helpers(compiled).unwrap(),
            "<style>@media print { a { color: red } }</style><%@ robots() %>"
        );
    }

    #[test]
    fn test_expands_after_self_closed_raw_elements() {
        assert_eq!(
            expand_helpers(r#"<script src="a.js" />@robots"#).unwrap(),
            r#"<script src="a.js" /><%@ robots() %>"#
        );
        assert_eq!(expand_helpers("<style />@robots").unwrap(), "<style /><%@ robots() %>");
        assert_eq!(
            expand_helpers(r#"<SCRIPT data-x="a>b"/>@keywords("shop")"#).unwrap(),
            r#"<SCRIPT data-x="a>b"/><%@ keywords("shop") %>"#
        );
    }

    #[test]
    fn test_skips_script_content_before_helpers() {
        let compiled = "<script>let a = '@x';</SCRIPT>@robots";
        assert_eq!(
            expand_helpers(compiled).unwrap(),
            "<script>let a = '@x';</SCRIPT><%@ robots() %>"
        );
    }

    #[test]
    fn test_unbalanced_arguments() {
        let err = expand_helpers("<p>@keywords(\"a\"</p>").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnbalancedHelperArguments {
                name: "keywords".to_string(),
                pos: 3
            }
        );
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(expand_helpers("héllo @robots ✓").unwrap(), "héllo <%@ robots() %> ✓");
    }
}
