use pulldown_cmark::{html, Options, Parser};

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};
use crate::util::{extension, with_extension};

const EXTENSIONS: &[&str] = &["md", "mdown", "markdown"];

pub(crate) fn is_markdown(path: &str) -> bool {
    extension(path).is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Renders markdown entries to HTML and rekeys them from `.md` to `.html`.
/// Smart punctuation is on, so straight quotes and dashes typeset properly.
#[derive(Debug, Default)]
pub struct Markdown;

impl Stage for Markdown {
    fn name(&self) -> &str {
        "markdown"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        for (path, entry) in snapshot.iter_mut() {
            if !is_markdown(path) {
                continue;
            }

            let text = entry.text().chain_with(|| error! {
                "markdown entry is not valid UTF-8",
                "path" => path,
            })?;

            let mut rendered = String::new();
            html::push_html(&mut rendered, Parser::new_ext(text, Options::all()));
            entry.set_text(rendered);
        }

        snapshot.rekey(|path, _| is_markdown(path).then(|| with_extension(path, "html")));
        Ok(())
    }
}
