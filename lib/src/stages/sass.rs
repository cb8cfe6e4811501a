use std::path::PathBuf;

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};
use crate::util::{basename, extension, with_extension};

const EXTENSIONS: &[&str] = &["scss", "sass"];

fn is_sass(path: &str) -> bool {
    extension(path).is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Compiles `.scss` and `.sass` entries to `.css`. Partials, files with a
/// `_`-prefixed basename, feed `@use` and `@import` only and are dropped
/// from the output.
#[derive(Debug, Default)]
pub struct Sass {
    load_paths: Vec<PathBuf>,
}

impl Sass {
    pub fn new() -> Self {
        Sass::default()
    }

    /// A directory consulted when resolving `@use` and `@import`.
    pub fn load_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.load_paths.push(path.into());
        self
    }
}

impl Stage for Sass {
    fn name(&self) -> &str {
        "sass"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        snapshot.retain(|path, _| !(is_sass(path) && basename(path).starts_with('_')));

        for (path, entry) in snapshot.iter_mut() {
            if !is_sass(path) {
                continue;
            }

            let mut options = grass::Options::default();
            if extension(path) == Some("sass") {
                options = options.input_syntax(grass::InputSyntax::Sass);
            }

            for load_path in &self.load_paths {
                options = options.load_path(load_path);
            }

            let text = entry.text().chain_with(|| error! {
                "sass entry is not valid UTF-8",
                "path" => path,
            })?;

            let css = grass::from_string(text, &options).chain_with(|| error! {
                "failed to render sass as css",
                "path" => path,
            })?;

            entry.set_text(css);
        }

        snapshot.rekey(|path, _| is_sass(path).then(|| with_extension(path, "css")));
        Ok(())
    }
}
