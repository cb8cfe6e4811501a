use std::path::PathBuf;

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};

/// An ordered list of stages plus the directories they run between.
///
/// [`run`](Pipeline::run) loads the source tree into a snapshot, threads
/// that one snapshot through every stage in registration order, then writes
/// the surviving entries under the output directory. A stage error aborts
/// the run before anything is written.
pub struct Pipeline {
    source: PathBuf,
    output: PathBuf,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new<S: Into<PathBuf>, O: Into<PathBuf>>(source: S, output: O) -> Self {
        Pipeline { source: source.into(), output: output.into(), stages: vec![] }
    }

    /// Append a stage. Order is a contract: a stage may depend on metadata
    /// and file-set changes made by the stages registered before it.
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run the full pipeline once: load, transform, write.
    pub fn run(&self) -> Result<()> {
        let mut snapshot = Snapshot::load(&self.source).chain_with(|| error! {
            "failed to load source tree",
            "source" => self.source.display(),
        })?;

        let mut ctx = Context::new();
        for stage in &self.stages {
            stage.run(&mut snapshot, &mut ctx).chain_with(|| error! {
                "build stage failed",
                "stage" => stage.name(),
            })?;
        }

        snapshot.write(&self.output).chain_with(|| error! {
            "failed to write output tree",
            "output" => self.output.display(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::snapshot::Entry;
    use crate::stage::stage;

    fn tree(root: &Path) -> Vec<(String, Vec<u8>)> {
        let snapshot = Snapshot::load(root).unwrap();
        let mut entries: Vec<_> = snapshot.iter()
            .map(|(k, e)| (k.to_string(), e.content.clone()))
            .collect();

        entries.sort();
        entries
    }

    #[test]
    fn deterministic_for_fixed_source_and_stages() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.md"), "hello *there*").unwrap();
        std::fs::write(source.path().join("b.md"), "general -- kenobi").unwrap();
        std::fs::write(source.path().join("c.txt"), "untouched").unwrap();

        let build = |output: &Path| {
            Pipeline::new(source.path(), output)
                .stage(crate::stages::Markdown)
                .stage(stage("tag", |snapshot, _| {
                    for (_, entry) in snapshot.iter_mut() {
                        entry.set_meta("seen", true);
                    }

                    Ok(())
                }))
                .run()
                .unwrap();
        };

        let (first, second) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        build(first.path());
        build(second.path());
        assert_eq!(tree(first.path()), tree(second.path()));
    }

    #[test]
    fn removal_is_invisible_to_later_stages() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("keep.txt"), "k").unwrap();
        std::fs::write(source.path().join("drop.txt"), "d").unwrap();

        let output = tempfile::tempdir().unwrap();
        Pipeline::new(source.path(), output.path())
            .stage(stage("remove", |snapshot, _| {
                snapshot.remove("drop.txt");
                Ok(())
            }))
            .stage(stage("check", |snapshot, _| {
                match snapshot.contains("drop.txt") {
                    true => err!("removed entry still visible"),
                    false => Ok(()),
                }
            }))
            .run()
            .unwrap();

        assert!(output.path().join("keep.txt").exists());
        assert!(!output.path().join("drop.txt").exists());
    }

    #[test]
    fn metadata_flows_to_later_stages() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), "a").unwrap();

        let output = tempfile::tempdir().unwrap();
        Pipeline::new(source.path(), output.path())
            .stage(stage("set", |snapshot, _| {
                snapshot.get_mut("a.txt").unwrap().set_meta("title", "A");
                Ok(())
            }))
            .stage(stage("read", |snapshot, _| {
                let entry = snapshot.get("a.txt").unwrap();
                match entry.meta("title").and_then(|v| v.as_str()) {
                    Some("A") => Ok(()),
                    other => err!("metadata not visible", "found" => format!("{other:?}")),
                }
            }))
            .run()
            .unwrap();
    }

    #[test]
    fn added_entries_are_written() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), "a").unwrap();

        let output = tempfile::tempdir().unwrap();
        Pipeline::new(source.path(), output.path())
            .stage(stage("generate", |snapshot, _| {
                snapshot.insert("generated/list.txt", Entry::new(b"a.txt".to_vec()));
                Ok(())
            }))
            .run()
            .unwrap();

        let generated = std::fs::read_to_string(output.path().join("generated/list.txt"));
        assert_eq!(generated.unwrap(), "a.txt");
    }

    #[test]
    fn failing_stage_aborts_without_writing() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), "a").unwrap();

        let output = tempfile::tempdir().unwrap();
        let error = Pipeline::new(source.path(), output.path())
            .stage(stage("fine", |_, _| Ok(())))
            .stage(stage("boom", |_, _| err!("kaboom")))
            .stage(stage("unreached", |_, _| panic!("must not run")))
            .run()
            .unwrap_err();

        let rendered = error.to_string();
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("kaboom"));
        assert!(!output.path().join("a.txt").exists());
    }

    #[test]
    fn missing_source_fails_before_stages() {
        let dir = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let error = Pipeline::new(dir.path().join("nope"), output.path())
            .stage(stage("unreached", |_, _| panic!("must not run")))
            .run()
            .unwrap_err();

        assert!(error.to_string().contains("failed to load source tree"));
    }
}
