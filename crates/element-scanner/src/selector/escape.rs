use std::fmt::Write;

/// Serializes `value` as a CSS identifier, following `CSS.escape`.
pub fn escape_ident(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 4);
    for (index, &ch) in chars.iter().enumerate() {
        let code = ch as u32;
        if ch == '\0' {
            out.push('\u{FFFD}');
        } else if (0x01..=0x1f).contains(&code) || code == 0x7f {
            push_code_point(&mut out, ch);
        } else if index == 0 && ch.is_ascii_digit() {
            push_code_point(&mut out, ch);
        } else if index == 1 && ch.is_ascii_digit() && chars[0] == '-' {
            push_code_point(&mut out, ch);
        } else if index == 0 && ch == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Escapes `value` for use inside a double-quoted CSS string.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        let code = ch as u32;
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ if (0x01..=0x1f).contains(&code) || code == 0x7f => push_code_point(&mut out, ch),
            _ => out.push(ch),
        }
    }
    out
}

/// `[name="value"]`, optionally prefixed by a tag.
pub fn attr_equals(tag: Option<&str>, name: &str, value: &str) -> String {
    format!(
        "{}[{}=\"{}\"]",
        tag.map(escape_ident).unwrap_or_default(),
        escape_ident(name),
        escape_string(value)
    )
}

fn push_code_point(out: &mut String, ch: char) {
    // trailing space terminates the hex escape
    let _ = write!(out, "\\{:x} ", ch as u32);
}
