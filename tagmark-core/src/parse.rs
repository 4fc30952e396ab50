//! Line-oriented heading extraction for Markdown and Typst
//!
//! The parser recognizes heading lines while skipping fenced code blocks,
//! and splits tag/remark annotations off the trailing comment. It is total:
//! lines that match nothing are simply skipped, and no input ever fails.

use crate::comment;
use crate::markup::{HeadingMatch, LineRange, MarkupKind};

/// Parse a full document into an ordered list of heading matches.
pub fn parse(text: &str, kind: MarkupKind) -> Vec<HeadingMatch> {
    let mut matches = Vec::new();
    // (marker char, run length) while inside a fenced code block
    let mut fence: Option<(char, usize)> = None;

    for (line_idx, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let fenceable = strip_fence_prefix(line);

        if let Some((marker, len)) = fence {
            if closes_fence(fenceable, marker, len) {
                fence = None;
            }
            // No heading or fence-open detection inside a fence
            continue;
        }

        if let Some(opened) = opens_fence(fenceable) {
            fence = Some(opened);
            continue;
        }

        let heading = match kind {
            MarkupKind::Markdown => match_markdown_heading(line),
            MarkupKind::Typst => match_typst_heading(line),
        };

        if let Some((level, title)) = heading {
            let (text, comment_body) = split_trailing_comment(title, kind);
            // A Typst line with only `=` markers (or markers plus a bare
            // comment) is not a heading
            if kind == MarkupKind::Typst && text.is_empty() {
                continue;
            }

            let (raw_tags, remark) = match comment_body {
                Some(body) => comment::decode(&body),
                None => (Vec::new(), None),
            };
            // HeadingMatch tags are duplicate-free by construction; the
            // remark/tag coupling policy is applied by callers at write
            // time, not here
            let mut tags: Vec<String> = Vec::with_capacity(raw_tags.len());
            for tag in raw_tags {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }

            let display_text = display_text(&text, kind);
            matches.push(HeadingMatch {
                kind,
                level,
                text,
                display_text,
                line: line_idx,
                range: LineRange::single(line_idx),
                tags,
                remark,
            });
        }
    }

    matches
}

/// Strip up to 3 leading spaces and any blockquote `>` markers before
/// fence detection
fn strip_fence_prefix(mut line: &str) -> &str {
    loop {
        let mut spaces = 0;
        while spaces < 3 && line.as_bytes().get(spaces) == Some(&b' ') {
            spaces += 1;
        }
        line = &line[spaces..];
        match line.strip_prefix('>') {
            Some(rest) => line = rest.strip_prefix(' ').unwrap_or(rest),
            None => return line,
        }
    }
}

/// A fence opens on a run of >= 3 identical backticks or tildes
fn opens_fence(line: &str) -> Option<(char, usize)> {
    let marker = match line.chars().next() {
        Some(c @ ('`' | '~')) => c,
        _ => return None,
    };
    let len = line.chars().take_while(|&c| c == marker).count();
    if len >= 3 {
        Some((marker, len))
    } else {
        None
    }
}

/// A fence closes on a run of >= the opening length of the same marker,
/// followed only by whitespace
fn closes_fence(line: &str, marker: char, len: usize) -> bool {
    let run = line.chars().take_while(|&c| c == marker).count();
    run >= len && line[run..].trim().is_empty()
}

/// `^(#{1,6})\s+(.*)$`: level is the number of hashes, title follows the
/// whitespace run
fn match_markdown_heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let title = rest.trim_start();
    if title.len() == rest.len() {
        // No whitespace after the markers
        return None;
    }
    Some((hashes, title))
}

/// `^(=+)` with unbounded repetition; the title is everything after the
/// markers. Whether the line really is a heading is decided by the caller
/// once the comment suffix has been stripped.
fn match_typst_heading(line: &str) -> Option<(usize, &str)> {
    let markers = line.chars().take_while(|&c| c == '=').count();
    if markers == 0 {
        return None;
    }
    Some((markers, &line[markers..]))
}

/// Split a raw title into `(text, comment body)` using the kind-appropriate
/// trailing-comment syntax. The comment must be the literal tail of the
/// line; content after `-->` disqualifies a Markdown comment.
fn split_trailing_comment(title: &str, kind: MarkupKind) -> (String, Option<String>) {
    match kind {
        MarkupKind::Markdown => {
            let trimmed = title.trim_end();
            if let Some(open) = trimmed.find("<!--") {
                if trimmed.ends_with("-->") && trimmed.len() >= open + 4 + 3 {
                    let body = trimmed[open + 4..trimmed.len() - 3].trim();
                    return (title[..open].trim().to_string(), Some(body.to_string()));
                }
            }
            (title.trim().to_string(), None)
        }
        MarkupKind::Typst => {
            if let Some(slash) = title.find("//") {
                let body = title[slash + 2..].trim();
                (title[..slash].trim().to_string(), Some(body.to_string()))
            } else {
                (title.trim().to_string(), None)
            }
        }
    }
}

/// Render a heading line from its parts, the inverse of heading matching
/// plus [`split_trailing_comment`]. `comment` is the encoded tag/remark
/// body; when it is empty the line carries no comment at all.
pub fn compose_heading_line(kind: MarkupKind, level: usize, text: &str, comment: &str) -> String {
    let marker = match kind {
        MarkupKind::Markdown => "#",
        MarkupKind::Typst => "=",
    };
    let mut line = format!("{} {text}", marker.repeat(level));
    if !comment.is_empty() {
        match kind {
            MarkupKind::Markdown => line.push_str(&format!(" <!-- {comment} -->")),
            MarkupKind::Typst => line.push_str(&format!(" // {comment}")),
        }
    }
    line
}

/// Presentation-only sanitizer; falls back to `text` rather than ever
/// producing an empty display label
fn display_text(text: &str, kind: MarkupKind) -> String {
    let cleaned = match kind {
        MarkupKind::Markdown => markdown_display_text(text),
        MarkupKind::Typst => typst_display_text(text),
    };
    if cleaned.is_empty() {
        text.to_string()
    } else {
        cleaned
    }
}

/// Strip Markdown inline markup (links, emphasis, code) by collecting the
/// text events of an inline parse
fn markdown_display_text(text: &str) -> String {
    use pulldown_cmark::{Event, Parser};

    let mut out = String::new();
    for event in Parser::new(text) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

const TYPST_INLINE_FNS: &[&str] = &[
    "link",
    "emph",
    "strong",
    "underline",
    "strike",
    "quote",
    "math",
];

/// Strip Typst inline syntax: `#fn(...)[...]` calls for a known set of
/// presentation functions, `<label>` tags, `$...$` math delimiters, and
/// backslash escapes
fn typst_display_text(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        match c {
            '#' => {
                if let Some((replacement, consumed)) = strip_typst_call(rest) {
                    out.push_str(&replacement);
                    rest = &rest[consumed..];
                } else {
                    out.push('#');
                    rest = &rest[1..];
                }
            }
            '<' => match rest.find('>') {
                Some(end) if rest[1..end].chars().all(is_label_char) && end > 1 => {
                    rest = &rest[end + 1..];
                }
                _ => {
                    out.push('<');
                    rest = &rest[1..];
                }
            },
            '$' => {
                // Drop the math delimiters, keep the content
                rest = &rest[1..];
            }
            '\\' => {
                let mut chars = rest.chars();
                chars.next();
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                    rest = &rest[1 + escaped.len_utf8()..];
                } else {
                    rest = &rest[1..];
                }
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    collapse_whitespace(&out)
}

fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.'
}

/// Try to strip a `#fn(...)[body]` call at the start of `s`. Returns the
/// replacement text and the number of bytes consumed. The bracket body wins
/// over the parenthesized argument (e.g. `#link("url")[label]` keeps the
/// label); a string argument is kept with its quotes removed.
fn strip_typst_call(s: &str) -> Option<(String, usize)> {
    let after_hash = &s[1..];
    let name_len = after_hash
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_hash.len());
    let name = &after_hash[..name_len];
    if !TYPST_INLINE_FNS.contains(&name) {
        return None;
    }

    let mut pos = 1 + name_len;
    let mut paren_arg: Option<String> = None;
    let mut bracket_arg: Option<String> = None;

    if s[pos..].starts_with('(') {
        let (inner, end) = balanced(&s[pos..], '(', ')')?;
        paren_arg = Some(inner.trim().trim_matches('"').to_string());
        pos += end;
    }
    if s[pos..].starts_with('[') {
        let (inner, end) = balanced(&s[pos..], '[', ']')?;
        // Bracket bodies may nest further inline markup
        bracket_arg = Some(typst_display_text(inner));
        pos += end;
    }

    if bracket_arg.is_none() && paren_arg.is_none() {
        return None;
    }
    Some((bracket_arg.or(paren_arg).unwrap_or_default(), pos))
}

/// Content of a balanced delimiter group starting at `s[0]`, plus the byte
/// offset just past the closing delimiter
fn balanced(s: &str, open: char, close: char) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some((&s[open.len_utf8()..i], i + close.len_utf8()));
            }
        }
    }
    None
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_heading_with_tags() {
        let matches = parse("## My Heading <!-- #todo #review -->", MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.kind, MarkupKind::Markdown);
        assert_eq!(m.level, 2);
        assert_eq!(m.text, "My Heading");
        assert_eq!(m.tags, vec!["todo", "review"]);
        assert_eq!(m.remark, None);
        assert_eq!(m.line, 0);
        assert_eq!(m.range, LineRange::single(0));
    }

    #[test]
    fn test_typst_heading_with_tags() {
        let matches = parse("== My Heading // #todo #review", MarkupKind::Typst);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.kind, MarkupKind::Typst);
        assert_eq!(m.level, 2);
        assert_eq!(m.text, "My Heading");
        assert_eq!(m.tags, vec!["todo", "review"]);
    }

    #[test]
    fn test_fenced_block_skipped() {
        let text = "# Real\n```\n## Not A Heading\n```\n## After\n";
        let matches = parse(text, MarkupKind::Markdown);
        let texts: Vec<_> = matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Real", "After"]);
    }

    #[test]
    fn test_fence_close_requires_matching_length() {
        let text = "````\n```\n## still fenced\n````\n## out\n";
        let matches = parse(text, MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "out");
    }

    #[test]
    fn test_tilde_fence_and_indented_fence() {
        let text = "~~~\n# fenced\n~~~\n   ```\n# also fenced\n   ```\n# free\n";
        let matches = parse(text, MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "free");
    }

    #[test]
    fn test_fence_inside_blockquote() {
        let text = "> ```\n> # quoted fence\n> ```\n# real\n";
        let matches = parse(text, MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "real");
    }

    #[test]
    fn test_compact_comment_form() {
        let matches = parse("# T1 <!--#a -->", MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "T1");
        assert_eq!(matches[0].tags, vec!["a"]);
    }

    #[test]
    fn test_comment_must_be_line_tail() {
        let matches = parse("# T <!-- #a --> trailing", MarkupKind::Markdown);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "T <!-- #a --> trailing");
        assert!(matches[0].tags.is_empty());
    }

    #[test]
    fn test_compose_heading_line_roundtrip() {
        for (kind, expected) in [
            (MarkupKind::Markdown, "## Title <!-- #a #b :: note :: -->"),
            (MarkupKind::Typst, "== Title // #a #b :: note ::"),
        ] {
            let body = comment::encode(&["a".to_string(), "b".to_string()], Some("note"));
            let line = compose_heading_line(kind, 2, "Title", &body);
            assert_eq!(line, expected);

            let matches = parse(&line, kind);
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].level, 2);
            assert_eq!(matches[0].text, "Title");
            assert_eq!(matches[0].tags, vec!["a", "b"]);
            assert_eq!(matches[0].remark.as_deref(), Some("note"));
        }
    }

    #[test]
    fn test_compose_heading_line_without_comment() {
        assert_eq!(
            compose_heading_line(MarkupKind::Markdown, 1, "Plain", ""),
            "# Plain"
        );
        assert_eq!(
            compose_heading_line(MarkupKind::Typst, 3, "Plain", ""),
            "=== Plain"
        );
    }

    #[test]
    fn test_seven_hashes_not_a_heading() {
        assert!(parse("####### Nope", MarkupKind::Markdown).is_empty());
    }

    #[test]
    fn test_hash_without_space_not_a_heading() {
        assert!(parse("#nospace", MarkupKind::Markdown).is_empty());
    }

    #[test]
    fn test_bare_typst_markers_not_a_heading() {
        assert!(parse("===", MarkupKind::Typst).is_empty());
        assert!(parse("=== ", MarkupKind::Typst).is_empty());
        // Markers plus only a comment is not a heading either
        assert!(parse("=== // #tag", MarkupKind::Typst).is_empty());
    }

    #[test]
    fn test_typst_level_unbounded() {
        let matches = parse("======== Deep", MarkupKind::Typst);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].level, 8);
        assert_eq!(matches[0].text, "Deep");
    }

    #[test]
    fn test_remark_decoded_from_comment() {
        let matches = parse(
            "## H <!-- #todo :: double-check the numbers :: -->",
            MarkupKind::Markdown,
        );
        assert_eq!(matches[0].tags, vec!["todo"]);
        assert_eq!(
            matches[0].remark.as_deref(),
            Some("double-check the numbers")
        );
    }

    #[test]
    fn test_remark_only_comment_preserved() {
        let matches = parse("# H <!-- :: just a note :: -->", MarkupKind::Markdown);
        assert!(matches[0].tags.is_empty());
        assert_eq!(matches[0].remark.as_deref(), Some("just a note"));
    }

    #[test]
    fn test_duplicate_tags_deduped_in_match() {
        let matches = parse("# H <!-- #a #a #b -->", MarkupKind::Markdown);
        assert_eq!(matches[0].tags, vec!["a", "b"]);
    }

    #[test]
    fn test_crlf_lines() {
        let matches = parse("# One\r\n# Two\r\n", MarkupKind::Markdown);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "One");
        assert_eq!(matches[1].text, "Two");
        assert_eq!(matches[1].line, 1);
    }

    #[test]
    fn test_markdown_display_text_strips_inline_markup() {
        let matches = parse("# A [link](https://x.y) and *emph*", MarkupKind::Markdown);
        assert_eq!(matches[0].display_text, "A link and emph");
        // `text` keeps the raw markup for mutation
        assert_eq!(matches[0].text, "A [link](https://x.y) and *emph*");
    }

    #[test]
    fn test_typst_display_text_strips_calls_and_labels() {
        assert_eq!(
            typst_display_text("See #link(\"https://x.y\")[the docs] <sec:intro>"),
            "See the docs"
        );
        assert_eq!(typst_display_text("A #emph[big] deal"), "A big deal");
        assert_eq!(typst_display_text("#strong[#emph[nested]]"), "nested");
    }

    #[test]
    fn test_typst_display_text_string_argument_form() {
        assert_eq!(
            typst_display_text("Go #link(\"https://x.y\")"),
            "Go https://x.y"
        );
    }

    #[test]
    fn test_typst_comment_splits_at_first_double_slash() {
        // The trailing-comment rule takes the leftmost `//`, even inside a
        // URL; the remainder becomes the comment body
        let matches = parse("= Read https://x.y // #todo", MarkupKind::Typst);
        assert_eq!(matches[0].text, "Read https:");
        // Tag tokens in the severed tail are still decoded
        assert_eq!(matches[0].tags, vec!["todo"]);
    }

    #[test]
    fn test_typst_display_text_math_and_escapes() {
        let matches = parse("= Energy $E = m c^2$ and \\# more", MarkupKind::Typst);
        assert_eq!(matches[0].display_text, "Energy E = m c^2 and # more");
    }

    #[test]
    fn test_display_text_never_empty() {
        let matches = parse("= $$", MarkupKind::Typst);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].display_text, "$$");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("", MarkupKind::Markdown).is_empty());
        assert!(parse("", MarkupKind::Typst).is_empty());
    }
}
