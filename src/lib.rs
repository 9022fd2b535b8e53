#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod diff;
mod report;

#[cfg(feature = "build-binary")]
pub mod render;
#[cfg(feature = "build-binary")]
pub mod scan;

pub use diff::{annotate, diff_reports, merge_diff, DiffEntry, Keyed};
pub use report::{
    split_group_version, Configuration, Report, Resource, ResourceObject, Server,
};
