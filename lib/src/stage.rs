use crate::error::Result;
use crate::snapshot::{Metadata, Snapshot};

/// Per-run scratch shared by every stage in a pipeline. Stages may publish
/// values into `globals` for later stages and the templating engine to
/// read. A fresh `Context` is created for every run.
#[derive(Debug, Default)]
pub struct Context {
    pub globals: Metadata,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }
}

/// A single transformation step over the snapshot.
///
/// Stages run strictly in registration order. Returning from `run` is the
/// stage's completion signal; the pipeline does not advance to the next
/// stage before it fires, and an `Err` aborts the run. A stage may mutate
/// entry content, attach or remove metadata, insert new entries, or remove
/// entries. Removals and metadata writes are visible to every later stage.
pub trait Stage {
    /// The name identifying this stage in error reports.
    fn name(&self) -> &str;

    fn run(&self, snapshot: &mut Snapshot, ctx: &mut Context) -> Result<()>;
}

/// A named stage backed by a closure. See [`stage`].
pub struct FnStage<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`Stage`], for one-off transformations that don't
/// warrant a type of their own.
pub fn stage<N, F>(name: N, f: F) -> FnStage<F>
    where N: Into<String>, F: Fn(&mut Snapshot, &mut Context) -> Result<()>
{
    FnStage { name: name.into(), f }
}

impl<F> Stage for FnStage<F>
    where F: Fn(&mut Snapshot, &mut Context) -> Result<()>
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, snapshot: &mut Snapshot, ctx: &mut Context) -> Result<()> {
        (self.f)(snapshot, ctx)
    }
}
