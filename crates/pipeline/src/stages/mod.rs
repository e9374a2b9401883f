//! The pipeline stages, each an `impl` block on [`crate::Workbench`].

pub mod clean;
pub mod explore;
pub mod outliers;
pub mod predict;
pub mod scale;
pub mod select;
pub mod smooth;
pub mod split;
pub mod train;
pub mod visualize;
