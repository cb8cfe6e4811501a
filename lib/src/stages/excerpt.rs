use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};

/// Captures the first paragraph of every markdown entry, rendered to HTML,
/// into an `excerpt` metadata field for index pages and feeds to quote.
/// Entries that already carry an `excerpt` keep it.
#[derive(Debug, Default)]
pub struct Excerpt;

impl Stage for Excerpt {
    fn name(&self) -> &str {
        "excerpt"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        for (path, entry) in snapshot.iter_mut() {
            if !super::markdown::is_markdown(path) || entry.meta("excerpt").is_some() {
                continue;
            }

            let Ok(text) = entry.text() else { continue };
            if let Some(excerpt) = first_paragraph(text) {
                entry.set_meta("excerpt", excerpt);
            }
        }

        Ok(())
    }
}

fn first_paragraph(text: &str) -> Option<String> {
    let mut events = Vec::new();
    let mut open = false;
    for event in Parser::new_ext(text, Options::all()) {
        match event {
            Event::Start(Tag::Paragraph) => {
                open = true;
                events.push(event);
            }
            Event::End(TagEnd::Paragraph) if open => {
                events.push(event);
                break;
            }
            // Headings and code before the first paragraph are skipped.
            _ if open => events.push(event),
            _ => {}
        }
    }

    if events.is_empty() {
        return None;
    }

    let mut excerpt = String::new();
    html::push_html(&mut excerpt, events.into_iter());
    Some(excerpt.trim_end().to_string())
}
