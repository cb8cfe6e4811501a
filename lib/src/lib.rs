#![doc = svgbobdoc::transform!(
//! A toolkit for building static-site build pipelines.
//!
//! # Overview
//!
//! Smelt turns a tree of source files into a deployable site tree. It reads
//! the source directory into an in-memory [`Snapshot`], runs that one
//! snapshot through an ordered list of [`Stage`]s, each free to mutate,
//! add, or remove entries, and writes whatever survives to an output
//! directory:
//!
//! ```svgbob
//! +--------+   +----------+   +---------+   +---------+   +--------+
//! | source |-->| Snapshot |-->| stage 1 |-->| stage N |-->| output |
//! +--------+   +----------+   +---------+   +---------+   +--------+
//! ```
//!
//! Stages run strictly in registration order: order is a contract, since a
//! stage may depend on metadata or file-set changes made by the stages
//! before it. A date-deriving stage must run before the templating stage
//! that renders the derived date, and a draft filter must run before the
//! stage that lists articles. Any stage error aborts the run before the
//! output directory is touched.
//!
//! The [`Stage`] trait is the only extension point. The stock stages in
//! [`stages`] cover the usual static-site transformations: front matter,
//! ignore filters, drafts, collections, excerpts, date derivation,
//! markdown, sass, permalinks, and templating through the [`templating`]
//! engine seam. A closure wrapped with [`stage()`] slots in anywhere.
//!
//! # Watching
//!
//! A [`Coordinator`] watches a directory tree and re-runs its pipeline
//! when files change. Bursts of filesystem events coalesce into one run,
//! events observed while a run is in flight queue exactly one further run,
//! and runs never overlap. A failed run is reported and watching
//! continues.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod snapshot;
pub mod stage;
pub mod pipeline;
pub mod watch;
pub mod templating;
pub mod stages;

pub use snapshot::{Entry, Metadata, Snapshot};
pub use stage::{stage, Context, Stage};
pub use pipeline::Pipeline;
pub use watch::Coordinator;

pub use rayon;
