use serde_json::{Map, Value};

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};
use crate::templating::Engine;

/// Renders every entry carrying a `template` metadata field through the
/// configured engine. A template sees the entry's metadata at top level,
/// the entry body as `content`, its `path`, and everything earlier stages
/// published into the context globals, `collections` among them.
#[derive(Debug)]
pub struct Templates<E> {
    engine: E,
}

impl<E: Engine> Templates<E> {
    pub fn new(engine: E) -> Self {
        Templates { engine }
    }
}

impl<E: Engine> Stage for Templates<E> {
    fn name(&self) -> &str {
        "templates"
    }

    fn run(&self, snapshot: &mut Snapshot, ctx: &mut Context) -> Result<()> {
        for (path, entry) in snapshot.iter_mut() {
            let Some(template) = entry.meta("template").and_then(Value::as_str) else {
                continue;
            };

            let template = template.to_string();
            let text = entry.text().chain_with(|| error! {
                "templated entry is not valid UTF-8",
                "path" => path,
            })?;

            let mut context: Map<String, Value> = ctx.globals.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            context.extend(entry.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
            context.insert("content".into(), Value::String(text.to_string()));
            context.insert("path".into(), Value::String(path.to_string()));

            let rendered = self.engine
                .render(&template, &Value::Object(context))
                .chain_with(|| error! {
                    "failed to render template",
                    "path" => path,
                    "template" => &template,
                })?;

            entry.set_text(rendered);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Entry;
    use crate::templating::MiniJinjaEngine;

    #[test]
    fn renders_metadata_content_and_globals() {
        let templates = tempfile::tempdir().unwrap();
        std::fs::write(
            templates.path().join("page.html"),
            "<h1>{{ title }}</h1>{{ content | safe }}<i>{{ collections.articles | length }}</i>",
        ).unwrap();

        let mut snapshot = Snapshot::new();
        snapshot.insert("a.html", Entry::new(b"<p>body</p>".to_vec()));
        let entry = snapshot.get_mut("a.html").unwrap();
        entry.set_meta("title", "A");
        entry.set_meta("template", "page.html");
        snapshot.insert("plain.html", Entry::new(b"untouched".to_vec()));

        let mut ctx = Context::new();
        ctx.globals.insert(
            "collections".into(),
            serde_json::json!({ "articles": [{ "title": "A" }] }),
        );

        let engine = MiniJinjaEngine::new(Some(templates.path()), &Default::default());
        Templates::new(engine).run(&mut snapshot, &mut ctx).unwrap();

        let rendered = snapshot.get("a.html").unwrap().text().unwrap();
        assert_eq!(rendered, "<h1>A</h1><p>body</p><i>1</i>");
        assert_eq!(snapshot.get("plain.html").unwrap().text().unwrap(), "untouched");
    }

    #[test]
    fn template_errors_name_the_entry() {
        let templates = tempfile::tempdir().unwrap();

        let mut snapshot = Snapshot::new();
        snapshot.insert("a.html", Entry::new(b"x".to_vec()));
        snapshot.get_mut("a.html").unwrap().set_meta("template", "missing.html");

        let engine = MiniJinjaEngine::new(Some(templates.path()), &Default::default());
        let error = Templates::new(engine)
            .run(&mut snapshot, &mut Context::new())
            .unwrap_err();

        let rendered = error.to_string();
        assert!(rendered.contains("a.html"));
        assert!(rendered.contains("missing.html"));
    }
}
