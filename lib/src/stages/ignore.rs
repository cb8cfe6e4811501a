use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};
use crate::util::basename;

/// Removes every entry whose base filename matches one of the configured
/// glob patterns. Matching is against the basename only, never the full
/// path, so `*.swp` drops editor droppings anywhere in the tree.
#[derive(Debug)]
pub struct Ignore {
    matcher: GlobSet,
}

impl Ignore {
    pub fn new<I>(patterns: I) -> Result<Self>
        where I: IntoIterator, I::Item: AsRef<str>
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(Glob::new(pattern).chain_with(|| error! {
                "invalid ignore pattern",
                "pattern" => pattern,
            })?);
        }

        Ok(Ignore { matcher: builder.build()? })
    }
}

impl Stage for Ignore {
    fn name(&self) -> &str {
        "ignore"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        snapshot.retain(|path, _| !self.matcher.is_match(basename(path)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Entry;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        for path in [".DS_Store", "posts/.DS_Store", "posts/a.md", "notes.swp", "b.md"] {
            snapshot.insert(path, Entry::new(vec![]));
        }

        snapshot
    }

    #[test]
    fn removes_matching_basenames_everywhere() {
        let mut snapshot = snapshot();
        let ignore = Ignore::new([".DS_Store", "*.swp"]).unwrap();
        ignore.run(&mut snapshot, &mut Context::new()).unwrap();

        let mut paths: Vec<_> = snapshot.paths().collect();
        paths.sort();
        assert_eq!(paths, ["b.md", "posts/a.md"]);
    }

    #[test]
    fn is_idempotent() {
        let mut snapshot = snapshot();
        let ignore = Ignore::new([".DS_Store"]).unwrap();
        ignore.run(&mut snapshot, &mut Context::new()).unwrap();
        let after_once: Vec<_> = snapshot.paths().map(String::from).collect();

        ignore.run(&mut snapshot, &mut Context::new()).unwrap();
        let after_twice: Vec<_> = snapshot.paths().map(String::from).collect();
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn completes_with_zero_matches() {
        let mut snapshot = snapshot();
        let ignore = Ignore::new(["*.nothing-has-this-extension"]).unwrap();
        ignore.run(&mut snapshot, &mut Context::new()).unwrap();
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn rejects_invalid_patterns() {
        assert!(Ignore::new(["a{"]).is_err());
    }
}
