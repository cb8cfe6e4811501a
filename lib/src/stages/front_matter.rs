use toml::Table;

use crate::error::{Chainable, Result};
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};

/// Parses a leading `+++` TOML block out of every text entry, merging its
/// keys into the entry's metadata and stripping the block from the content.
/// Runs first so that later stages see `title`, `date`, `draft` and friends
/// as plain metadata.
#[derive(Debug, Default)]
pub struct FrontMatter;

const PREFIX: &str = "+++\n";
const SUFFIX: &str = "\n+++\n";

impl Stage for FrontMatter {
    fn name(&self) -> &str {
        "front-matter"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        for (path, entry) in snapshot.iter_mut() {
            // Binary entries cannot carry front matter.
            let Ok(text) = entry.text() else { continue };
            let Some(rest) = text.strip_prefix(PREFIX) else { continue };
            let Some((block, content)) = rest.split_once(SUFFIX) else { continue };
            let (block, content) = (block.to_string(), content.to_string());
            let table: Table = toml::from_str(&block).chain_with(|| error! {
                "invalid front matter",
                "path" => path,
            })?;

            for (key, value) in table {
                let value = serde_json::to_value(value).chain_with(|| error! {
                    "unrepresentable front matter value",
                    "path" => path,
                    "key" => &key,
                })?;

                entry.metadata.insert(key, value);
            }

            entry.set_text(content);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Entry;

    #[test]
    fn parses_and_strips_the_block() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "post.md",
            Entry::new(b"+++\ntitle = \"A Post\"\ndraft = false\n+++\nThe body.".to_vec()),
        );

        FrontMatter.run(&mut snapshot, &mut Context::new()).unwrap();

        let entry = snapshot.get("post.md").unwrap();
        assert_eq!(entry.meta("title").unwrap(), "A Post");
        assert_eq!(entry.meta("draft").unwrap(), false);
        assert_eq!(entry.text().unwrap(), "The body.");
    }

    #[test]
    fn leaves_plain_entries_alone() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("plain.md", Entry::new(b"No block here.".to_vec()));
        snapshot.insert("binary.png", Entry::new(vec![0xff, 0xfe, 0x00]));

        FrontMatter.run(&mut snapshot, &mut Context::new()).unwrap();

        let entry = snapshot.get("plain.md").unwrap();
        assert!(entry.metadata.is_empty());
        assert_eq!(entry.text().unwrap(), "No block here.");
    }

    #[test]
    fn rejects_malformed_blocks() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("bad.md", Entry::new(b"+++\nnot toml ===\n+++\nbody".to_vec()));

        let error = FrontMatter.run(&mut snapshot, &mut Context::new()).unwrap_err();
        assert!(error.to_string().contains("bad.md"));
    }
}
