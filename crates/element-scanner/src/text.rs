//! Display text extraction.

use dom_adapter::NodeView;

const ELLIPSIS: char = '…';

/// Text a user would read on the control, bounded to `limit` characters.
///
/// Form fields prefer their value (for button-like inputs) or placeholder; everything
/// else prefers rendered text and falls back to the accessible label.
pub fn display_text(view: &NodeView, text_content: &str, limit: usize) -> String {
    let text = match view.tag.as_str() {
        "input" => {
            let kind = view.attr("type").unwrap_or("text").to_ascii_lowercase();
            let button_like = matches!(kind.as_str(), "button" | "submit" | "reset");
            let ordered: &[&str] = if button_like {
                &["value", "aria-label", "title"]
            } else {
                &["placeholder", "aria-label", "title", "value"]
            };
            first_attr(view, ordered)
        }
        "textarea" | "select" => first_attr(view, &["placeholder", "aria-label", "title"])
            .or_else(|| non_blank(text_content)),
        _ => non_blank(text_content).or_else(|| first_attr(view, &["aria-label", "title", "value"])),
    };
    truncate(&collapse_whitespace(text.unwrap_or_default()), limit)
}

/// Char-boundary safe truncation; the ellipsis counts towards `limit`.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut truncated: String = text.chars().take(limit - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

fn first_attr<'a>(view: &'a NodeView, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| view.attr(name).and_then(non_blank))
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use elementscan_core_types::NodeId;

    use super::*;

    fn view(tag: &str, attrs: &[(&str, &str)]) -> NodeView {
        NodeView {
            id: NodeId(3),
            tag: tag.into(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: String::new(),
            rect: None,
            style: BTreeMap::new(),
            parent: None,
            scope_root: NodeId(0),
            shadow_root: None,
            content_document: None,
        }
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 5), "héll…");
        assert_eq!(truncate("🎵🎵🎵", 2), "🎵…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn picks_source_by_tag() {
        let search = view("input", &[("placeholder", "Search songs"), ("value", "")]);
        assert_eq!(display_text(&search, "", 100), "Search songs");

        let submit = view("input", &[("type", "submit"), ("value", "Send")]);
        assert_eq!(display_text(&submit, "", 100), "Send");

        let icon = view("button", &[("aria-label", "Close dialog")]);
        assert_eq!(display_text(&icon, "  ", 100), "Close dialog");

        let link = view("a", &[("aria-label", "ignored")]);
        assert_eq!(display_text(&link, " Read\n  more ", 100), "Read more");
    }
}
