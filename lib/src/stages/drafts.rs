use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};

/// Removes entries marked `draft = true` before anything downstream can
/// render or list them.
#[derive(Debug, Default)]
pub struct Drafts;

impl Stage for Drafts {
    fn name(&self) -> &str {
        "drafts"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        snapshot.retain(|_, entry| !entry.flag("draft"));
        Ok(())
    }
}
