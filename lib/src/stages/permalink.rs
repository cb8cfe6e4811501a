use serde_json::Value;

use crate::error::Result;
use crate::snapshot::{Entry, Snapshot};
use crate::stage::{Context, Stage};
use crate::util::{basename, extension, slugify};

/// Rewrites rendered pages to pretty directory URLs. With the pattern
/// `:year/:month/:title`, a `post.html` carrying `year = 2021`, `month = 3`
/// and `title = "A Post"` moves to `2021/3/a-post/index.html`, and the
/// site-relative `url` lands in its metadata.
///
/// `:field` tokens resolve from metadata; `:title` is slugified. Entries
/// missing a referenced field stay where they are, as do files already
/// named `index.html`.
#[derive(Debug)]
pub struct Permalink {
    pattern: String,
}

impl Permalink {
    pub fn new<P: Into<String>>(pattern: P) -> Self {
        Permalink { pattern: pattern.into() }
    }

    fn resolve(&self, entry: &Entry) -> Option<String> {
        let mut segments = Vec::new();
        for token in self.pattern.split('/') {
            let segment = match token.strip_prefix(':') {
                Some(field) => render(entry.meta(field)?, field)?,
                None => token.to_string(),
            };

            segments.push(segment);
        }

        Some(segments.join("/"))
    }
}

fn render(value: &Value, field: &str) -> Option<String> {
    let rendered = match value {
        Value::String(string) if field == "title" => slugify(string),
        Value::String(string) => string.clone(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };

    (!rendered.is_empty()).then_some(rendered)
}

impl Stage for Permalink {
    fn name(&self) -> &str {
        "permalink"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        // Resolve every move first, then apply, so resolution never sees a
        // half-moved snapshot.
        let moves: Vec<(String, String, String)> = snapshot.iter()
            .filter(|(path, _)| extension(path) == Some("html"))
            .filter(|(path, _)| basename(path) != "index.html")
            .filter_map(|(path, entry)| {
                self.resolve(entry).map(|resolved| {
                    let key = format!("{resolved}/index.html");
                    let url = format!("/{resolved}/");
                    (path.to_string(), key, url)
                })
            })
            .collect();

        for (old, new, url) in moves {
            if let Some(mut entry) = snapshot.remove(&old) {
                entry.set_meta("url", url);
                snapshot.insert(new, entry);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(snapshot: &mut Snapshot, path: &str, title: &str) {
        snapshot.insert(path, Entry::new(vec![]));
        let entry = snapshot.get_mut(path).unwrap();
        entry.set_meta("title", title);
        entry.set_meta("year", 2021);
        entry.set_meta("month", 3);
    }

    #[test]
    fn rewrites_to_pretty_paths_and_records_url() {
        let mut snapshot = Snapshot::new();
        post(&mut snapshot, "hello.html", "Hello, World!");

        let stage = Permalink::new(":year/:month/:title");
        stage.run(&mut snapshot, &mut Context::new()).unwrap();

        assert!(!snapshot.contains("hello.html"));
        let entry = snapshot.get("2021/3/hello-world/index.html").unwrap();
        assert_eq!(entry.meta("url").unwrap(), "/2021/3/hello-world/");
    }

    #[test]
    fn entries_missing_a_field_stay_in_place() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("about.html", Entry::new(vec![]));
        snapshot.get_mut("about.html").unwrap().set_meta("title", "About");

        Permalink::new(":year/:month/:title")
            .run(&mut snapshot, &mut Context::new())
            .unwrap();

        assert!(snapshot.contains("about.html"));
        assert!(snapshot.get("about.html").unwrap().meta("url").is_none());
    }

    #[test]
    fn index_and_non_html_entries_are_skipped() {
        let mut snapshot = Snapshot::new();
        post(&mut snapshot, "index.html", "Home");
        snapshot.insert("style.css", Entry::new(vec![]));

        Permalink::new(":year/:month/:title")
            .run(&mut snapshot, &mut Context::new())
            .unwrap();

        assert!(snapshot.contains("index.html"));
        assert!(snapshot.contains("style.css"));
    }

    #[test]
    fn is_idempotent_over_rewritten_entries() {
        let mut snapshot = Snapshot::new();
        post(&mut snapshot, "hello.html", "Hello");

        let stage = Permalink::new(":year/:month/:title");
        stage.run(&mut snapshot, &mut Context::new()).unwrap();
        stage.run(&mut snapshot, &mut Context::new()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("2021/3/hello/index.html"));
    }
}
