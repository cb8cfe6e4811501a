use std::path::{Path, PathBuf};
use std::time::SystemTime;

use smelt::err;
use smelt::error::Result;
use smelt::stages::*;
use smelt::templating::MiniJinjaEngine;
use smelt::{Coordinator, Pipeline};

use crate::config::Settings;

mod config;

pub const CONTENT_DIR: &str = "content";
pub const TEMPLATE_DIR: &str = "templates";
pub const CONFIG_FILE: &str = "config.toml";

xflags::xflags! {
    /// Build a static site from a project directory.
    cmd bellows {
        /// The project directory: `content/`, plus optional `templates/`
        /// and `config.toml`.
        required input: PathBuf
        /// The directory the built site is written into.
        required output: PathBuf

        /// Keep running and rebuild whenever watched files change.
        optional -w,--watch
    }
}

fn main() {
    let flags = Bellows::from_env_or_exit();
    if let Err(e) = run(&flags) {
        println!("error: {e}");
        std::process::exit(1);
    }
}

fn run(flags: &Bellows) -> Result<()> {
    let settings = Settings::discover(&flags.input)?;
    let pipeline = assemble(&flags.input, &flags.output, &settings)?;

    let start = SystemTime::now();
    pipeline.run()?;
    if let Ok(elapsed) = start.elapsed() {
        println!("build time: {}ms", elapsed.as_millis());
    }

    if flags.watch {
        println!("watching for changes...");
        return Coordinator::new(pipeline, &flags.input, &settings.watch)?
            .on_outcome(|outcome| match outcome {
                Ok(()) => println!("rebuilt"),
                Err(e) => println!("rebuild failed: {e}"),
            })
            .watch();
    }

    Ok(())
}

fn assemble(input: &Path, output: &Path, settings: &Settings) -> Result<Pipeline> {
    let content = input.join(CONTENT_DIR);
    if !content.is_dir() {
        return err! {
            "project has no content directory",
            "expected" => content.display(),
        };
    }

    let templates = input.join(TEMPLATE_DIR);
    let engine = MiniJinjaEngine::new(
        templates.is_dir().then_some(&templates),
        &settings.globals,
    );

    let mut groups = Vec::new();
    for (name, collection) in &settings.collections {
        let mut group = Group::new(name);
        if let Some(pattern) = &collection.pattern {
            group = group.pattern(pattern)?;
        }

        if let Some(key) = &collection.sort_by {
            group = group.sort_by(key);
        }

        groups.push(group.reverse(collection.reverse));
    }

    let pipeline = Pipeline::new(&content, output)
        .stage(FrontMatter)
        .stage(Ignore::new(&settings.ignore)?)
        .stage(Drafts)
        .stage(Collections::new(groups))
        .stage(Excerpt)
        .stage(Dates)
        .stage(Markdown);

    #[cfg(feature = "sass")]
    let pipeline = pipeline.stage(Sass::new().load_path(&content));

    Ok(pipeline
        .stage(Permalink::new(&settings.permalink))
        .stage(Templates::new(engine)))
}
