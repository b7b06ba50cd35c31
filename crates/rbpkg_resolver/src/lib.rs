#![deny(missing_docs)]
//! The dependency graph and resolution engine: expanding a set of
//! user-requested packages into a conflict-free, topologically ordered
//! install plan.

mod engine;
mod graph;

pub use engine::{BundleInfo, InstallDepsMode, PackageSelection, PendingInstall};
pub use graph::DependencyGraph;
