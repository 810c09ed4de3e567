//! Plain-text and URL cleanup applied to every stored field.

/// Reduces arbitrary input to a single line of plain text.
///
/// Strips `<...>` tags, drops percent-encoded octets, turns control
/// characters (line breaks and tabs included) into spaces, collapses runs of
/// whitespace and trims the result.
pub fn sanitize_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let without_octets = strip_percent_octets(&stripped);

    let mut out = String::with_capacity(without_octets.len());
    let mut pending_space = false;
    for c in without_octets.chars() {
        if c.is_whitespace() || c.is_control() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        // A '<' only opens a tag when followed by a letter, '/', '!' or '?'.
        let opens_tag = c == '<'
            && matches!(
                chars.peek(),
                Some(n) if n.is_ascii_alphabetic() || matches!(*n, '/' | '!' | '?')
            );
        if !opens_tag {
            out.push(c);
            continue;
        }
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '>' {
                closed = true;
                break;
            }
        }
        if !closed {
            break;
        }
    }
    out
}

fn strip_percent_octets(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        // Advance by whole characters so multi-byte text survives.
        let ch_len = input[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&input[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Returns `raw` when it is an absolute `http`/`https` URL, else an empty string.
///
/// Whitespace and control characters anywhere in the URL, a missing host, or
/// characters that are never valid in a URL make it invalid.
pub fn sanitize_url(raw: &str) -> String {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return String::new();
    }

    let rest = match candidate.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            rest
        }
        _ => return String::new(),
    };

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default();
    let host_name = host.split(':').next().unwrap_or_default();
    if host_name.is_empty() {
        return String::new();
    }

    let forbidden = |c: char| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '<' | '>' | '"' | '\\' | '`' | '{' | '}' | '|' | '^')
    };
    if candidate.chars().any(forbidden) {
        return String::new();
    }

    candidate.to_string()
}
