use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::errors::WikiError;
use crate::services::MarkdownService;
use crate::types::{Page, Template};
use crate::utils::{escape_attr, escape_html};

/// Path every shell's search box posts to
pub const SEARCH_ACTION: &str = "/search/pages";

/// Renders the view, edit and search templates.
///
/// Each template is a content fragment placed into a page shell. Shells come
/// from `<template_dir>/<name>.html` when present (with `{{TITLE}}` and
/// `{{CONTENT}}` placeholders), otherwise a built-in shell is used.
#[derive(Debug, Clone, Default)]
pub struct TemplateComponent {
    shells: HashMap<Template, String>,
    markdown: MarkdownService,
}

impl TemplateComponent {
    /// Template component using only the built-in shells
    pub fn new() -> Self {
        Self::default()
    }

    /// Read custom shells once at startup. Missing files fall back to the
    /// built-in shell; unreadable ones are an error.
    pub fn load(template_dir: Option<&Path>) -> Result<Self, WikiError> {
        let mut component = Self::new();
        let Some(dir) = template_dir else {
            return Ok(component);
        };

        for template in Template::ALL {
            let path = dir.join(format!("{}.html", template.name()));
            match fs::read_to_string(&path) {
                Ok(shell) => {
                    log::info!("Loaded {} template from {}", template.name(), path.display());
                    component.shells.insert(template, shell);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("No {} template at {}, using built-in", template.name(), path.display());
                }
                Err(e) => {
                    return Err(WikiError::TemplateError(format!("{}: {}", path.display(), e)));
                }
            }
        }
        Ok(component)
    }

    pub fn render_view(&self, page: &Page) -> Result<String, WikiError> {
        let rendered = self.markdown.render_with_toc(&page.body_text());
        let title = escape_html(&page.title);
        let content = format!(
            "<h1>{title}</h1>\
             <p class=\"meta\">[<a href=\"/edit/{href}\">edit</a>]</p>\
             {toc}<div class=\"page-body\">{body}</div>",
            href = escape_attr(&page.title),
            toc = rendered.toc,
            body = rendered.html,
        );
        self.render_shell(Template::View, &page.title, &content)
    }

    pub fn render_edit(&self, page: &Page) -> Result<String, WikiError> {
        let content = format!(
            "<h1>Editing {title}</h1>\
             <form action=\"/save/{href}\" method=\"POST\">\
             <div><textarea name=\"body\" rows=\"20\" cols=\"80\">{body}</textarea></div>\
             <div><input type=\"submit\" value=\"Save\"></div>\
             </form>",
            title = escape_html(&page.title),
            href = escape_attr(&page.title),
            body = escape_html(&page.body_text()),
        );
        self.render_shell(Template::Edit, &page.title, &content)
    }

    /// `page.links` holds the matching titles
    pub fn render_search(&self, query: &str, page: &Page, notice: Option<&str>) -> Result<String, WikiError> {
        let mut content = String::new();
        content.push_str(&format!(
            "<h1 class=\"search-header\">Search results for \"{}\"</h1>",
            escape_html(query)
        ));
        if let Some(notice) = notice {
            content.push_str(&format!("<p class=\"notice\">{}</p>", escape_html(notice)));
        }

        if page.links.is_empty() {
            content.push_str("<p class=\"no-results\">No pages found.</p>");
        } else {
            content.push_str(&format!(
                "<p class=\"results-count\">Found {} page{}</p><ul class=\"results\">",
                page.links.len(),
                if page.links.len() == 1 { "" } else { "s" }
            ));
            for title in &page.links {
                content.push_str(&format!(
                    "<li><a href=\"/view/{}\">{}</a></li>",
                    escape_attr(title),
                    escape_html(title)
                ));
            }
            content.push_str("</ul>");
        }

        self.render_shell(Template::Search, &page.title, &content)
    }

    fn render_shell(&self, template: Template, title: &str, content: &str) -> Result<String, WikiError> {
        let Some(shell) = self.shells.get(&template) else {
            return Ok(builtin_shell(&escape_html(title), content));
        };

        if !shell.contains("{{CONTENT}}") {
            return Err(WikiError::TemplateError(format!(
                "{} template has no {{{{CONTENT}}}} placeholder",
                template.name()
            )));
        }
        Ok(shell
            .replace("{{TITLE}}", &escape_html(title))
            .replace("{{CONTENT}}", content))
    }

    #[cfg(test)]
    fn with_shell(mut self, template: Template, shell: &str) -> Self {
        self.shells.insert(template, shell.to_string());
        self
    }
}

fn builtin_shell(title: &str, content: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title></head><body>\
         <header><form class=\"search\" action=\"{SEARCH_ACTION}\" method=\"POST\">\
         <input type=\"text\" name=\"body\" placeholder=\"Search pages\">\
         <input type=\"submit\" value=\"Search\"></form></header>\
         <main>{content}</main></body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_renders_markdown_body() {
        let html = TemplateComponent::new().render_view(&Page::new("Test", "Hello *there*")).unwrap();
        assert!(html.contains("<title>Test</title>"));
        assert!(html.contains("<p>Hello <em>there</em></p>"));
        assert!(html.contains("href=\"/edit/Test\""));
        assert!(html.contains(SEARCH_ACTION));
    }

    #[test]
    fn edit_form_posts_to_save_with_escaped_body() {
        let html = TemplateComponent::new()
            .render_edit(&Page::new("Test", "</textarea><b>"))
            .unwrap();
        assert!(html.contains("action=\"/save/Test\""));
        assert!(html.contains("name=\"body\""));
        assert!(html.contains("&lt;/textarea&gt;&lt;b&gt;"));
    }

    #[test]
    fn search_lists_links_and_notice() {
        let page = Page { links: vec!["Alpha".into(), "Beta".into()], ..Page::scaffold("search") };
        let html = TemplateComponent::new().render_search("a<b", &page, None).unwrap();
        assert!(html.contains("Search results for \"a&lt;b\""));
        assert!(html.contains("<a href=\"/view/Alpha\">Alpha</a>"));
        assert!(html.contains("Found 2 pages"));

        let empty = Page::scaffold("search");
        let html = TemplateComponent::new()
            .render_search("x", &empty, Some("Search is down"))
            .unwrap();
        assert!(html.contains("<p class=\"notice\">Search is down</p>"));
        assert!(html.contains("No pages found."));
    }

    #[test]
    fn custom_shell_placeholders() {
        let templates = TemplateComponent::new()
            .with_shell(Template::View, "<title>{{TITLE}}</title><div>{{CONTENT}}</div>");
        let html = templates.render_view(&Page::new("Home", "hi")).unwrap();
        assert!(html.starts_with("<title>Home</title><div><h1>Home</h1>"));
    }

    #[test]
    fn shell_without_content_placeholder_fails() {
        let templates = TemplateComponent::new().with_shell(Template::Edit, "<html></html>");
        let err = templates.render_edit(&Page::scaffold("Home")).unwrap_err();
        assert!(matches!(err, WikiError::TemplateError(_)));
    }

    #[test]
    fn load_without_dir_uses_builtins() {
        let templates = TemplateComponent::load(None).unwrap();
        assert!(templates.shells.is_empty());
    }
}
