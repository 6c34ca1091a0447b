//! Page rendering.
//!
//! The build pipeline only decides *which* pages to render; turning a source
//! document into an output file is delegated to a [`PageRenderer`].
//! [`HtmlRenderer`] is the stock implementation:
//!
//! - **Markdown** is converted with pulldown-cmark (tables, footnotes,
//!   strikethrough, task lists). The first level-1 heading becomes the page
//!   title and is removed from the body; without one the title is
//!   `Untitled`. An empty document gets a placeholder body.
//! - **Html** sources are copied through unchanged.
//!
//! Markdown pages are wrapped in a small maud shell carrying the title, the
//! canonical URL and the source's last-modified date.
//!
//! Validate-only entries are rendered in full but nothing is written.

use crate::page::{PageEntry, PageKind};
use crate::site::Site;
use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_TITLE: &str = "Untitled";
const PLACEHOLDER_BODY: &str = "*Nothing here yet...*";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Turns one page into its output file.
pub trait PageRenderer {
    /// Render `entry` and write it under the site's output root.
    ///
    /// Returns the number of bytes written, which is 0 for validate-only
    /// entries.
    fn render(&self, entry: &PageEntry, site: &Site) -> Result<usize, RenderError>;
}

/// Stock renderer producing standalone HTML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl PageRenderer for HtmlRenderer {
    fn render(&self, entry: &PageEntry, site: &Site) -> Result<usize, RenderError> {
        let source = entry.source_file(&site.source_root);
        let raw = fs::read(&source).map_err(|e| RenderError::Read {
            path: source.clone(),
            source: e,
        })?;
        let text = String::from_utf8_lossy(&raw);

        let output = match entry.kind() {
            PageKind::Markdown => {
                let doc = MarkdownDoc::parse(&text, entry.dest_path());
                page_document(&doc, entry.url_path(), entry.source_modified()).into_string()
            }
            PageKind::Html => text.into_owned(),
        };

        if entry.validate_only() {
            return Ok(0);
        }
        let dest = entry.dest_file(&site.dest_root);
        write_output(&dest, &output).map_err(|e| RenderError::Write {
            path: dest,
            source: e,
        })?;
        Ok(output.len())
    }
}

fn write_output(dest: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, contents)
}

/// A parsed Markdown page split into title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDoc {
    /// Title as inline HTML.
    pub title_html: String,
    /// Title with markup stripped, for `<title>`.
    pub title_text: String,
    pub body_html: String,
}

impl MarkdownDoc {
    /// Parse `source`. `dest` names the placeholder heading when the
    /// document is empty.
    pub fn parse(source: &str, dest: &Path) -> Self {
        let placeholder;
        let source = if source.trim().is_empty() {
            let stem = dest
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            placeholder = format!("# {stem}\n{PLACEHOLDER_BODY}");
            placeholder.as_str()
        } else {
            source
        };

        let events: Vec<Event<'_>> = Parser::new_ext(source, markdown_options()).collect();
        let mut title: Option<Vec<Event<'_>>> = None;
        let mut body = Vec::with_capacity(events.len());
        let mut in_title = false;

        for event in events {
            match event {
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if title.is_none() => {
                    in_title = true;
                    title = Some(Vec::new());
                }
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => in_title = false,
                event if in_title => {
                    if let Some(t) = title.as_mut() {
                        t.push(event);
                    }
                }
                event => body.push(event),
            }
        }

        let title = title.unwrap_or_else(|| vec![Event::Text(DEFAULT_TITLE.into())]);
        let title_text = title
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect::<String>();
        let mut title_html = String::new();
        md_html::push_html(&mut title_html, title.into_iter());
        let mut body_html = String::new();
        md_html::push_html(&mut body_html, body.into_iter());

        Self {
            title_html,
            title_text,
            body_html,
        }
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Wraps a rendered Markdown page in the HTML shell.
fn page_document(doc: &MarkdownDoc, url: &str, modified: DateTime<Utc>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (doc.title_text) }
                link rel="canonical" href=(url);
            }
            body {
                article {
                    h1 { (PreEscaped(&doc.title_html)) }
                    p.last-modified { "Last modified: " (modified.format("%d %b %y").to_string()) }
                    (PreEscaped(&doc.body_html))
                }
            }
        }
    }
}
