//! Stage transform bodies: the table type and the statistics each
//! pipeline stage applies to it. Nothing here touches the artifact layout.

pub mod clean;
pub mod error;
pub mod explore;
pub mod frame;
pub mod model;
pub mod outliers;
pub mod scale;
pub mod select;
pub mod smooth;
pub mod split;
pub mod stats;
pub mod tree;
pub mod visualize;

pub use clean::{encode, fill_missing, Encoding, MissingStrategy};
pub use error::*;
pub use explore::{filter_by_target, summarize, EdaSummary};
pub use frame::{format_number, Frame};
pub use model::{LinearFit, Metrics, ModelKey, Regressor, SvrFit, DEFAULT_RIDGE_ALPHA};
pub use outliers::{handle_outliers, OutlierMethod, OutlierReport};
pub use scale::{Scaler, ScalerKind};
pub use select::{rank_features, validate_selection, FeatureScore};
pub use smooth::{smooth_column, SmoothMethod};
pub use split::{split_indices, SplitIndices, SplitMethod, MIN_SPLIT_ROWS};
pub use tree::{RandomForest, RegressionTree, TreeParams};
pub use visualize::{
    compare_by_target, histogram, visualize, Histogram, PlotKind, ScatterData, TargetComparison,
    Visualization, DEFAULT_SCATTER_LIMIT,
};
