use std::collections::HashMap;

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::utils::{escape_attr, escape_html};

/// Markdown rendering result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownResult {
    pub html: String,
    /// Empty when the body has fewer than two headings
    pub toc: String,
}

/// Renders page bodies. Raw HTML in a body is shown as text, never passed
/// through.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownService;

impl MarkdownService {
    pub fn new() -> Self {
        Self
    }

    /// Render markdown with heading anchors and a table of contents
    pub fn render_with_toc(&self, content: &str) -> MarkdownResult {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let events: Vec<Event> = Parser::new_ext(content, options).map(neutralize_html).collect();
        let headings = collect_headings(&events);

        // Headings become raw markup carrying their ids; everything else goes
        // through one writer so table and image state carries across events
        let mut next_heading = headings.iter();
        let mut open: Vec<(u32, &str)> = Vec::new();
        let events = events.into_iter().map(|ev| match ev {
            Event::Start(Tag::Heading { level, .. }) => {
                let lvl = heading_level_to_u32(level);
                let id = next_heading.next().map(|(_, id, _)| id.as_str()).unwrap_or("");
                open.push((lvl, id));
                Event::Html(format!("<h{} id=\"{}\">", lvl, escape_attr(id)).into())
            }
            Event::End(TagEnd::Heading(level)) => {
                let (lvl, id) = open.pop().unwrap_or((heading_level_to_u32(level), ""));
                Event::Html(
                    format!(
                        "<a class=\"hlink\" href=\"#{}\" aria-label=\"Link to this section\">#</a></h{}>\n",
                        escape_attr(id),
                        lvl
                    )
                    .into(),
                )
            }
            other => other,
        });

        let mut out = String::new();
        html::push_html(&mut out, events);

        let toc = if headings.len() > 1 { build_toc_html(&headings) } else { String::new() };
        MarkdownResult { html: out, toc }
    }
}

fn neutralize_html(ev: Event<'_>) -> Event<'_> {
    match ev {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    }
}

/// (level, unique id, text) for every heading, in document order
fn collect_headings(events: &[Event]) -> Vec<(u32, String, String)> {
    let mut headings = Vec::new();
    let mut id_counts: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(u32, String)> = None;

    for ev in events {
        match ev {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((heading_level_to_u32(*level), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((lvl, text)) = current.take() {
                    let mut id = slugify(&text);
                    if id.is_empty() {
                        id = format!("h{}", lvl);
                    }
                    let count = id_counts.entry(id.clone()).or_insert(0);
                    if *count > 0 {
                        id = format!("{}-{}", id, *count);
                    }
                    *count += 1;
                    headings.push((lvl, id, text));
                }
            }
            Event::Text(t) | Event::Code(t) => push_heading_text(&mut current, t),
            Event::SoftBreak | Event::HardBreak => {
                push_heading_text(&mut current, &CowStr::Borrowed(" "))
            }
            _ => {}
        }
    }
    headings
}

fn push_heading_text(current: &mut Option<(u32, String)>, text: &CowStr) {
    if let Some((_, buf)) = current.as_mut() {
        buf.push_str(text);
    }
}

fn build_toc_html(headings: &[(u32, String, String)]) -> String {
    let mut html = String::new();
    html.push_str("<nav class=\"toc\"><div class=\"toc-title\">Contents</div>");
    let mut current = 0u32;
    for (level, id, title) in headings {
        while current < *level { html.push_str("<ul>"); current += 1; }
        while current > *level { html.push_str("</ul>"); current -= 1; }
        html.push_str(&format!("<li><a href=\"#{}\">{}</a></li>", escape_attr(id), escape_html(title)));
    }
    while current > 0 { html.push_str("</ul>"); current -= 1; }
    html.push_str("</nav>");
    html
}

fn heading_level_to_u32(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Create URL-friendly slug from text
fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = false;
    for ch in text.chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if (c.is_ascii_whitespace() || c == '-' || c == '_') && !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    if out.ends_with('-') { out.pop(); }
    out
}
