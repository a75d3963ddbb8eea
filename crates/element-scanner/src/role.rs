use dom_adapter::NodeView;

/// ARIA role of the element and whether it was stated explicitly.
///
/// The first token of a `role` attribute wins; otherwise the implicit role of the tag.
pub fn infer_role(view: &NodeView) -> (String, bool) {
    if let Some(role) = view
        .attr("role")
        .and_then(|value| value.split_whitespace().next())
    {
        return (role.to_ascii_lowercase(), true);
    }
    (implicit_role(view).to_string(), false)
}

fn implicit_role(view: &NodeView) -> &'static str {
    match view.tag.as_str() {
        "button" | "summary" => "button",
        "a" | "area" if view.has_attr("href") => "link",
        "select" => {
            let multiple = view.has_attr("multiple");
            let sized = view
                .attr("size")
                .and_then(|size| size.trim().parse::<u32>().ok())
                .map_or(false, |size| size > 1);
            if multiple || sized {
                "listbox"
            } else {
                "combobox"
            }
        }
        "textarea" => "textbox",
        "option" => "option",
        "input" => input_role(view),
        _ => "generic",
    }
}

fn input_role(view: &NodeView) -> &'static str {
    let kind = view.attr("type").unwrap_or("text").trim().to_ascii_lowercase();
    match kind.as_str() {
        "button" | "submit" | "reset" | "image" => "button",
        "checkbox" => "checkbox",
        "radio" => "radio",
        "range" => "slider",
        "number" => "spinbutton",
        "search" => "searchbox",
        "email" | "tel" | "text" | "url" | "password" if view.has_attr("list") => "combobox",
        _ => "textbox",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use elementscan_core_types::NodeId;

    use super::*;

    fn view(tag: &str, attrs: &[(&str, &str)]) -> NodeView {
        NodeView {
            id: NodeId(7),
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
    fn explicit_role_wins() {
        assert_eq!(infer_role(&view("div", &[("role", "Tab panel")])), ("tab".into(), true));
    }

    #[test]
    fn implicit_roles_follow_tag_semantics() {
        assert_eq!(infer_role(&view("a", &[("href", "/")])).0, "link");
        assert_eq!(infer_role(&view("a", &[])).0, "generic");
        assert_eq!(infer_role(&view("input", &[("type", "checkbox")])).0, "checkbox");
        assert_eq!(infer_role(&view("input", &[])).0, "textbox");
        assert_eq!(infer_role(&view("select", &[("multiple", "")])).0, "listbox");
        assert_eq!(infer_role(&view("summary", &[])).0, "button");
    }
}
