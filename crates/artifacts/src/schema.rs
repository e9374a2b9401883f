use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ACTIVE_MARKER: &str = "active_dataset.txt";
pub const PROCESSING_MARKER: &str = "processing_dataset.txt";
pub const SELECTION_FILE: &str = "xy_selection.json";
pub const INDEX_FILE: &str = "artifact_index.json";

/// One directory per artifact family, relative to the data root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactDir {
    Uploads,
    Cleaned,
    Splits,
    Models,
    Predictions,
    Processed,
    Plots,
    Eda,
    TmpUploads,
}

impl ArtifactDir {
    pub const ALL: [ArtifactDir; 9] = [
        ArtifactDir::Uploads,
        ArtifactDir::Cleaned,
        ArtifactDir::Splits,
        ArtifactDir::Models,
        ArtifactDir::Predictions,
        ArtifactDir::Processed,
        ArtifactDir::Plots,
        ArtifactDir::Eda,
        ArtifactDir::TmpUploads,
    ];

    /// Directories holding derived artifacts (everything but raw uploads).
    pub const DERIVED: [ArtifactDir; 8] = [
        ArtifactDir::Cleaned,
        ArtifactDir::Splits,
        ArtifactDir::Models,
        ArtifactDir::Predictions,
        ArtifactDir::Processed,
        ArtifactDir::Plots,
        ArtifactDir::Eda,
        ArtifactDir::TmpUploads,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactDir::Uploads => "uploads",
            ArtifactDir::Cleaned => "cleaned",
            ArtifactDir::Splits => "splits",
            ArtifactDir::Models => "models",
            ArtifactDir::Predictions => "predictions",
            ArtifactDir::Processed => "processed",
            ArtifactDir::Plots => "plots",
            ArtifactDir::Eda => "eda",
            ArtifactDir::TmpUploads => "tmp_uploads",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitPart {
    XTrain,
    XTest,
    YTrain,
    YTest,
}

impl SplitPart {
    pub const ALL: [SplitPart; 4] = [
        SplitPart::XTrain,
        SplitPart::XTest,
        SplitPart::YTrain,
        SplitPart::YTest,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            SplitPart::XTrain => "X_train",
            SplitPart::XTest => "X_test",
            SplitPart::YTrain => "y_train",
            SplitPart::YTest => "y_test",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaledPart {
    XTrain,
    XTest,
}

impl ScaledPart {
    pub const ALL: [ScaledPart; 2] = [ScaledPart::XTrain, ScaledPart::XTest];

    pub fn suffix(self) -> &'static str {
        match self {
            ScaledPart::XTrain => "X_train_scaled",
            ScaledPart::XTest => "X_test_scaled",
        }
    }
}

/// Every artifact the pipeline knows how to name.
///
/// The file name of each kind is a deterministic function of
/// `(base_name, kind)`; `Processing` is the exception because it is an
/// indirection through the processing pointer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Raw,
    Cleaned,
    Processing,
    Split(SplitPart),
    Scaled(ScaledPart),
    ScalerParams,
    Model { key: String, version: String },
    Prediction { key: String },
    Smoothed { column: String, method: String },
    Filtered { target: String, lower: String, upper: String },
    EdaSummary,
    CorrelationPlot { target: String },
    /// `columns` is the plotted column names joined with `-`.
    VisualizePlot { columns: String },
    ComparisonPlot { target: String },
}

impl ArtifactKind {
    pub fn dir(&self) -> ArtifactDir {
        match self {
            ArtifactKind::Raw | ArtifactKind::Processing => ArtifactDir::Uploads,
            ArtifactKind::Cleaned => ArtifactDir::Cleaned,
            ArtifactKind::Split(_) | ArtifactKind::Scaled(_) | ArtifactKind::ScalerParams => {
                ArtifactDir::Splits
            }
            ArtifactKind::Model { .. } => ArtifactDir::Models,
            ArtifactKind::Prediction { .. } => ArtifactDir::Predictions,
            ArtifactKind::Smoothed { .. } | ArtifactKind::Filtered { .. } => ArtifactDir::Processed,
            ArtifactKind::EdaSummary => ArtifactDir::Eda,
            ArtifactKind::CorrelationPlot { .. }
            | ArtifactKind::VisualizePlot { .. }
            | ArtifactKind::ComparisonPlot { .. } => ArtifactDir::Plots,
        }
    }

    /// File name inside [`ArtifactKind::dir`]. `Processing` names the raw
    /// file, which is where resolution lands when no pointer applies.
    pub fn file_name(&self, base: &str) -> String {
        match self {
            ArtifactKind::Raw | ArtifactKind::Processing => dataset_file_name(base),
            ArtifactKind::Cleaned => format!("{base}_cleaned.csv"),
            ArtifactKind::Split(part) => format!("{base}_{}.csv", part.suffix()),
            ArtifactKind::Scaled(part) => format!("{base}_{}.csv", part.suffix()),
            ArtifactKind::ScalerParams => format!("{base}_scaler.json"),
            ArtifactKind::Model { key, version } => format!("{base}_{key}_{version}.pkl"),
            ArtifactKind::Prediction { key } => format!("{base}_{key}_predictions.csv"),
            ArtifactKind::Smoothed { column, method } => {
                format!("{base}_{}_{}.csv", safe_name(column), safe_name(method))
            }
            ArtifactKind::Filtered { target, lower, upper } => format!(
                "{base}_filtered_{}_{}_{}.csv",
                safe_name(target),
                safe_name(lower),
                safe_name(upper)
            ),
            ArtifactKind::EdaSummary => format!("{base}_summary.json"),
            ArtifactKind::CorrelationPlot { target } => {
                format!("{base}_correlation_{}.json", safe_name(target))
            }
            ArtifactKind::VisualizePlot { columns } => {
                format!("{base}_visualize_{}.json", safe_name(columns))
            }
            ArtifactKind::ComparisonPlot { target } => {
                format!("{base}_compare_{}.json", safe_name(target))
            }
        }
    }

    /// Derived data that becomes stale when an upstream stage rewrites the
    /// processing artifact. Models and predictions are versioned history
    /// and are not part of this set.
    pub fn is_split_or_scaled(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Split(_) | ArtifactKind::Scaled(_) | ArtifactKind::ScalerParams
        )
    }
}

/// Raw datasets are always normalised to CSV.
pub fn dataset_file_name(base: &str) -> String {
    format!("{base}.csv")
}

/// Filename stem used as the join key across every artifact kind.
pub fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// True when `stem` is `base` itself or `base` followed by the `_`
/// separator. A bare prefix is not enough: `A` must not own `AB_cleaned`.
pub fn belongs_to(base: &str, stem: &str) -> bool {
    match stem.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest.starts_with('_'),
        None => false,
    }
}

/// Replace anything but word characters, `-` and `.` with `_`.
pub fn safe_name(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parsed `<base>_<key>_<version>` model file stem.
///
/// Model keys never contain `_` and versions are all digits, so the stem is
/// split from the right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelVersionName {
    pub base: String,
    pub key: String,
    pub version: String,
}

impl ModelVersionName {
    pub fn parse(stem: &str) -> Option<Self> {
        let mut parts = stem.rsplitn(3, '_');
        let version = parts.next()?;
        let key = parts.next()?;
        let base = parts.next()?;
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if key.is_empty() || base.is_empty() {
            return None;
        }
        Some(Self {
            base: base.to_string(),
            key: key.to_string(),
            version: version.to_string(),
        })
    }

    pub fn stem(&self) -> String {
        format!("{}_{}_{}", self.base, self.key, self.version)
    }
}
