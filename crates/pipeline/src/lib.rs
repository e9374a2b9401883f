//! The staged regression pipeline: dataset lifecycle, the ordered stages
//! that read and write artifacts through the active/processing pointers,
//! and the trained-model bundle.

pub mod bundle;
pub mod config;
pub mod error;
pub mod stage;
pub mod stages;
pub mod workbench;

pub use bundle::{version_stamp, ModelBundle};
pub use config::WorkbenchConfig;
pub use error::{PipelineError, Result, StageOutcome, Summary};
pub use stage::{require, Stage};
pub use stages::clean::{CleanParams, CleanResult};
pub use stages::explore::{ExploreResult, FilterParams, FilterResult};
pub use stages::outliers::{OutlierParams, OutlierResult};
pub use stages::predict::{ModelInfo, PredictResult, PredictSource, Preview};
pub use stages::scale::ScaleResult;
pub use stages::select::{RankParams, RankResult, SelectParams};
pub use stages::smooth::{SmoothParams, SmoothResult, SmoothRun};
pub use stages::split::SplitResult;
pub use stages::train::{TrainParams, TrainResult};
pub use stages::visualize::{CompareParams, CompareResult, VisualizeParams, VisualizeResult};
pub use workbench::{DatasetListing, DeleteReport, FileWorkbench, UploadReceipt, Workbench};
