//! Turns an [`ErrorPageSpec`] into HTML plus button registrations.

use crate::page::ButtonCallback;
use crate::page::ErrorPageSpec;
use pd_core::RequestHandle;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style type="text/css">{style}</style>
</head>
<body>
<div id="errorContainer">
<div id="errorTitle"><span class="error-icon">{error_icon}</span><h1 id="errorTitleText">{heading}</h1></div>
<div id="errorMessage"><p>{content}</p>{message}</div>
{buttons}
</div>
</body>
</html>
"#;

/// Output of [`render_page`].
pub struct RenderedPage {
    pub content: String,
    pub uri: String,
    pub request: Option<RequestHandle>,
    pub registrations: Vec<(usize, ButtonCallback)>,
}

pub fn render_page(page: ErrorPageSpec, max_passes: usize) -> RenderedPage {
    let mut buttons = String::new();
    let mut registrations = Vec::with_capacity(page.buttons.len());
    if !page.buttons.is_empty() {
        buttons.push_str("<form name=\"bl\">");
        for (index, button) in page.buttons.into_iter().enumerate() {
            let _ = write!(
                buttons,
                "<input type=\"button\" class=\"{}\" value=\"{}\" data-index=\"{index}\" />",
                escape_html(&button.css_class),
                escape_html(&button.label)
            );
            registrations.push((index, button.callback));
        }
        buttons.push_str("</form>");
    }

    let message: String = page
        .message
        .iter()
        .map(|line| format!("<p>{line}</p>"))
        .collect();

    let mut values = BTreeMap::new();
    values.insert("title", page.title);
    values.insert("style", page.style);
    values.insert("error_icon", page.error_icon);
    values.insert("heading", page.heading);
    values.insert("content", page.content);
    values.insert("message", message);
    values.insert("buttons", buttons);
    values.insert("uri", escape_html(&page.uri));

    RenderedPage {
        content: fill_template(PAGE_TEMPLATE, &values, max_passes),
        uri: page.uri,
        request: page.request,
        registrations,
    }
}

/// Substitutes `{name}` placeholders until nothing changes or `max_passes` runs out.
///
/// Unknown placeholders are left as written.
pub fn fill_template(template: &str, values: &BTreeMap<&str, String>, max_passes: usize) -> String {
    let mut current = template.to_owned();
    for _ in 0..max_passes {
        let next = substitute_once(&current, values);
        if next == current {
            return next;
        }
        current = next;
    }

    if substitute_once(&current, values) != current {
        log::warn!("template substitution did not settle after {max_passes} passes");
    }
    current
}

fn substitute_once(input: &str, values: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let name_len = after_open
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(after_open.len());
        let name = &after_open[..name_len];

        match values.get(name) {
            Some(value) if after_open[name_len..].starts_with('}') => {
                out.push_str(value);
                rest = &after_open[name_len + 1..];
            }
            _ => {
                out.push('{');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_html(input: &str) -> String {
    v_htmlescape::escape(input).to_string()
}
