//! Trailing-comment tag/remark codec
//!
//! Headings carry annotations in a trailing comment, e.g.
//! `<!-- #todo #review :: needs a second pass :: -->` for Markdown or
//! `// #todo :: needs a second pass ::` for Typst. The comment body is the
//! same in both syntaxes: whitespace-separated `#tag` tokens plus at most
//! one `::...::` delimited remark, in either order. A literal `::` inside a
//! remark is escaped as `\:\:`.

/// Decode a comment body into `(tags, remark)`.
///
/// Tags come back in left-to-right order without the `#` sigil; duplicates
/// are preserved at this layer (de-duplication is caller policy, see
/// [`normalize_tags_and_remark`]). The remark is the content of the first
/// well-formed `::...::` span, trimmed and unescaped; an empty remark span
/// decodes to `None`.
pub fn decode(comment: &str) -> (Vec<String>, Option<String>) {
    let (rest, remark) = split_remark(comment);

    let tags = rest
        .split_whitespace()
        .filter_map(|tok| tok.strip_prefix('#'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    (tags, remark)
}

/// Encode `(tags, remark)` back into a comment body.
///
/// Returns an empty string when both are empty; callers must omit the
/// comment wrapper entirely in that case.
pub fn encode(tags: &[String], remark: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !tags.is_empty() {
        let joined = tags
            .iter()
            .map(|t| format!("#{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(joined);
    }

    if let Some(remark) = remark {
        let trimmed = remark.trim();
        if !trimmed.is_empty() {
            parts.push(format!(":: {} ::", escape_remark(trimmed)));
        }
    }

    parts.join(" ")
}

/// De-duplicate tags and reconcile the remark/tag coupling policy.
///
/// - Duplicate tags are dropped, first occurrence wins, order preserved.
/// - If a remark is present and no tag other than the marker remains, the
///   `remark_marker` tag (when provided) is force-added so the heading stays
///   discoverable by tag search.
/// - If no remark is present, a stray marker tag is stripped.
/// - If no tags remain after all that, the remark is cleared too: a remark
///   cannot exist with an empty tag set.
pub fn normalize_tags_and_remark(
    tags: &[String],
    remark: Option<&str>,
    remark_marker: Option<&str>,
) -> (Vec<String>, Option<String>) {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        if !seen.iter().any(|t| t == tag) {
            seen.push(tag.clone());
        }
    }

    let remark = remark.map(str::trim).filter(|r| !r.is_empty());

    match (remark, remark_marker) {
        (Some(_), Some(marker)) => {
            if !seen.iter().any(|t| t != marker) && !seen.iter().any(|t| t == marker) {
                seen.push(marker.to_string());
            }
        }
        (None, Some(marker)) => {
            seen.retain(|t| t != marker);
        }
        _ => {}
    }

    if seen.is_empty() {
        (seen, None)
    } else {
        (seen, remark.map(str::to_string))
    }
}

/// Remove the first well-formed `::...::` span, returning the remaining
/// comment text and the decoded remark (if any).
fn split_remark(comment: &str) -> (String, Option<String>) {
    let open = match find_unescaped_delim(comment, 0) {
        Some(i) => i,
        None => return (comment.to_string(), None),
    };
    let close = match find_unescaped_delim(comment, open + 2) {
        Some(i) => i,
        None => return (comment.to_string(), None),
    };

    let body = unescape_remark(comment[open + 2..close].trim());
    let mut rest = String::with_capacity(comment.len());
    rest.push_str(&comment[..open]);
    rest.push(' ');
    rest.push_str(&comment[close + 2..]);

    let remark = if body.is_empty() { None } else { Some(body) };
    (rest, remark)
}

/// Byte offset of the next `::` not preceded by a backslash
fn find_unescaped_delim(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i + 1 < bytes.len() {
        if bytes[i] == b':' && bytes[i + 1] == b':' && (i == 0 || bytes[i - 1] != b'\\') {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn escape_remark(remark: &str) -> String {
    remark.replace("::", "\\:\\:")
}

fn unescape_remark(remark: &str) -> String {
    remark.replace("\\:", ":")
}
