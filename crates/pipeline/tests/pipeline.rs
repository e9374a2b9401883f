use pipeline::{
    CleanParams, CompareParams, FileWorkbench, FilterParams, OutlierParams, PipelineError,
    PredictSource, SmoothParams, Stage, TrainParams, VisualizeParams, WorkbenchConfig,
};
use std::path::Path;
use tabular::{
    MissingStrategy, ModelKey, OutlierMethod, PlotKind, ScalerKind, SmoothMethod, SplitMethod,
};

/// `x,y` with `y = 3x + (x mod 3)`; x is blank on rows listed in `gaps`.
fn dataset(rows: usize, gaps: &[usize]) -> Vec<u8> {
    let mut text = String::from("x,y\n");
    for i in 0..rows {
        let y = 3 * i + i % 3;
        if gaps.contains(&i) {
            text.push_str(&format!(",{y}\n"));
        } else {
            text.push_str(&format!("{i},{y}\n"));
        }
    }
    text.into_bytes()
}

fn open(root: &Path) -> FileWorkbench {
    FileWorkbench::open(WorkbenchConfig::with_root(root)).unwrap()
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(prefix))
            .collect(),
        Err(_) => vec![],
    }
}

fn fill_x(wb: &mut FileWorkbench) {
    wb.clean(&CleanParams {
        column: "x".into(),
        missing: Some(MissingStrategy::Mean),
        encoding: None,
    })
    .unwrap();
}

fn random(test_size: f64) -> SplitMethod {
    SplitMethod::Random {
        test_size,
        seed: 42,
    }
}

fn linear() -> TrainParams {
    train_with(ModelKey::Linear)
}

fn train_with(model: ModelKey) -> TrainParams {
    TrainParams {
        model,
        alpha: None,
        scale_target: false,
    }
}

fn ready_to_train(wb: &mut FileWorkbench) {
    wb.upload("A.csv", &dataset(20, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();
    wb.scale(ScalerKind::Standard).unwrap();
}

fn smooth(column: &str, method: SmoothMethod, clear: bool, promote: bool) -> SmoothParams {
    SmoothParams {
        column: column.into(),
        method,
        clear,
        promote,
    }
}

#[test]
fn test_upload_sets_active_and_keeps_shape() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    let receipt = wb.upload("A.csv", &dataset(20, &[])).unwrap();
    assert_eq!(receipt.name, "A.csv");
    assert_eq!(receipt.rows, 20);
    assert_eq!(receipt.columns, vec!["x", "y"]);
    assert_eq!(wb.active_dataset().unwrap().as_deref(), Some("A.csv"));
    assert!(wb.processing_path().unwrap().ends_with("uploads/A.csv"));

    // pointers are files, so a fresh workbench sees the same state
    let mut reopened = open(dir.path());
    assert_eq!(reopened.active_dataset().unwrap().as_deref(), Some("A.csv"));
}

#[test]
fn test_full_run_then_delete_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[3, 7])).unwrap();

    fill_x(&mut wb);
    assert!(wb.processing_path().unwrap().ends_with("cleaned/A_cleaned.csv"));

    wb.save_xy(&["x".to_string()], "y").unwrap();
    let split = wb.split(&random(0.25)).unwrap();
    assert_eq!((split.train_rows, split.test_rows), (15, 5));
    assert!(root.join("splits/A_X_train.csv").exists());
    assert!(root.join("splits/A_X_test.csv").exists());

    wb.scale(ScalerKind::Standard).unwrap();
    assert!(root.join("splits/A_X_train_scaled.csv").exists());
    assert!(root.join("splits/A_scaler.json").exists());

    let trained = wb.train(&linear()).unwrap();
    assert!(trained.model_id.starts_with("A_linear_"));
    assert_eq!(wb.list_models(Some("A")).unwrap().len(), 1);

    let on_test = wb.predict(&trained.model_id, PredictSource::Test).unwrap();
    assert_eq!(on_test.rows, 5);
    assert!(on_test.metrics.is_some());
    assert!(on_test.preview.columns.contains(&"predicted".to_string()));

    let upload = PredictSource::Upload {
        name: "fresh.csv".into(),
        bytes: b"x\n1\n2\n3\n".to_vec(),
    };
    let on_upload = wb.predict(&trained.model_id, upload).unwrap();
    assert_eq!(on_upload.rows, 3);
    assert!(on_upload.metrics.is_none());
    assert!(root.join(&on_upload.output).exists());

    let report = wb.delete_datasets(&["A.csv".to_string()]).unwrap();
    assert_eq!(report.deleted, vec!["A.csv"]);
    assert!(report.active_cleared);
    assert!(report.failures.is_empty());
    assert!(!root.join("uploads/active_dataset.txt").exists());
    for sub in ["cleaned", "splits", "models", "predictions", "eda", "tmp_uploads"] {
        assert!(
            files_with_prefix(&root.join(sub), "A").is_empty(),
            "leftovers in {sub}"
        );
    }
    // the upload prediction was owned by A as well
    assert!(!root.join(&on_upload.output).exists());
    assert!(wb.load_xy().unwrap().x.is_empty());
    assert!(matches!(
        wb.explore(false),
        Err(PipelineError::NoActiveDataset)
    ));
}

#[test]
fn test_split_needs_ten_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("nine.csv", &dataset(9, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    assert!(matches!(
        wb.split(&random(0.25)),
        Err(PipelineError::InvalidParameter { .. })
    ));

    wb.upload("ten.csv", &dataset(10, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    let split = wb.split(&random(0.25)).unwrap();
    assert_eq!((split.train_rows, split.test_rows), (7, 3));
}

#[test]
fn test_split_requires_selection_for_active_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("A.csv", &dataset(12, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.upload("B.csv", &dataset(12, &[])).unwrap();
    match wb.split(&random(0.25)) {
        Err(PipelineError::MissingPrerequisite { stage, .. }) => {
            assert_eq!(stage, Stage::FeatureSelection)
        }
        other => panic!("expected missing selection, got {other:?}"),
    }
}

#[test]
fn test_clean_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(12, &[2])).unwrap();
    fill_x(&mut wb);
    let first = std::fs::read(root.join("cleaned/A_cleaned.csv")).unwrap();
    fill_x(&mut wb);
    let second = std::fs::read(root.join("cleaned/A_cleaned.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_percentile_filter_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("A.csv", &dataset(20, &[])).unwrap();

    let all = wb
        .filter_target(&FilterParams {
            target: "y".into(),
            lower: 0.0,
            upper: 100.0,
            promote: false,
        })
        .unwrap();
    assert_eq!((all.rows_before, all.rows_after), (20, 20));
    assert!(all.output.ends_with("A_filtered_y_0_100.csv"));
    // not promoted
    assert!(wb.processing_path().unwrap().ends_with("uploads/A.csv"));

    let inverted = wb.filter_target(&FilterParams {
        target: "y".into(),
        lower: 60.0,
        upper: 40.0,
        promote: false,
    });
    assert!(matches!(
        inverted,
        Err(PipelineError::InvalidParameter { .. })
    ));
}

#[test]
fn test_selection_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("A.csv", &dataset(12, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    let loaded = wb.load_xy().unwrap();
    assert_eq!(loaded.x, vec!["x"]);
    assert_eq!(loaded.y.as_deref(), Some("y"));

    assert!(matches!(
        wb.save_xy(&["nope".to_string()], "y"),
        Err(PipelineError::ColumnNotFound(_))
    ));
}

#[test]
fn test_scale_before_split_names_split_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("A.csv", &dataset(12, &[])).unwrap();
    match wb.scale(ScalerKind::Standard) {
        Err(PipelineError::MissingPrerequisite { stage, .. }) => assert_eq!(stage, Stage::Split),
        other => panic!("expected missing split, got {other:?}"),
    }
    match wb.train(&linear()) {
        Err(PipelineError::MissingPrerequisite { stage, .. }) => assert_eq!(stage, Stage::Scale),
        other => panic!("expected missing scale, got {other:?}"),
    }
}

#[test]
fn test_promotion_invalidates_split_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[4])).unwrap();
    fill_x(&mut wb);
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.2)).unwrap();
    wb.scale(ScalerKind::Minmax).unwrap();

    fill_x(&mut wb);
    assert!(!root.join("splits/A_X_train.csv").exists());
    assert!(!root.join("splits/A_X_train_scaled.csv").exists());
    assert!(!root.join("splits/A_scaler.json").exists());
}

#[test]
fn test_model_retention_prunes_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WorkbenchConfig::with_root(dir.path());
    config.model_retention = 2;
    let mut wb = FileWorkbench::open(config).unwrap();
    wb.upload("A.csv", &dataset(20, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();
    wb.scale(ScalerKind::Standard).unwrap();

    let first = wb.train(&linear()).unwrap();
    wb.train(&linear()).unwrap();
    let third = wb.train(&linear()).unwrap();
    assert_eq!(third.pruned, 1);

    let models = wb.list_models(Some("A")).unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, third.model_id);
    assert!(matches!(
        wb.predict(&first.model_id, PredictSource::Test),
        Err(PipelineError::UnknownModel(_))
    ));
}

#[test]
fn test_explore_cache_follows_processing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    wb.upload("A.csv", &dataset(12, &[1])).unwrap();
    assert!(!wb.explore(false).unwrap().cached);
    assert!(wb.explore(false).unwrap().cached);
    assert!(!wb.explore(true).unwrap().cached);

    fill_x(&mut wb);
    let after = wb.explore(false).unwrap();
    assert!(!after.cached);
    assert!(after.source.ends_with("A_cleaned.csv"));
}

#[test]
fn test_stages_without_active_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    assert!(matches!(
        wb.split(&random(0.25)),
        Err(PipelineError::NoActiveDataset)
    ));
    assert!(matches!(
        wb.scale(ScalerKind::Standard),
        Err(PipelineError::NoActiveDataset)
    ));
    assert!(matches!(
        wb.train(&linear()),
        Err(PipelineError::NoActiveDataset)
    ));
    assert!(matches!(
        wb.save_xy(&["x".to_string()], "y"),
        Err(PipelineError::NoActiveDataset)
    ));
    assert!(matches!(
        wb.smooth(&smooth("x", SmoothMethod::Median { kernel: 3 }, false, false)),
        Err(PipelineError::NoActiveDataset)
    ));
}

#[test]
fn test_smoothing_runs_accumulate_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[])).unwrap();

    let first = wb
        .smooth(&smooth("x", SmoothMethod::Lowess { frac: 0.3 }, false, false))
        .unwrap();
    assert_eq!(first.runs.len(), 1);
    assert!(root.join("processed/A_x_lowess.csv").exists());
    let second = wb
        .smooth(&smooth("x", SmoothMethod::Median { kernel: 3 }, false, false))
        .unwrap();
    assert_eq!(second.runs.len(), 2);
    assert_eq!(wb.smoothing_runs().len(), 2);

    let cleared = wb
        .smooth(&smooth("x", SmoothMethod::Median { kernel: 5 }, true, false))
        .unwrap();
    assert_eq!(cleared.runs.len(), 1);

    let other_column = wb
        .smooth(&smooth("y", SmoothMethod::Median { kernel: 3 }, false, false))
        .unwrap();
    assert_eq!(other_column.runs.len(), 1);
    assert_eq!(other_column.runs[0].column, "y_median");
    // nothing promoted yet
    assert!(wb.processing_path().unwrap().ends_with("uploads/A.csv"));
}

#[test]
fn test_smoothing_promotion_drops_splits() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();
    assert!(root.join("splits/A_X_train.csv").exists());

    let promoted = wb
        .smooth(&smooth("x", SmoothMethod::Median { kernel: 3 }, false, true))
        .unwrap();
    assert!(promoted.promoted);
    assert!(wb
        .processing_path()
        .unwrap()
        .ends_with("processed/A_x_median.csv"));
    assert!(!root.join("splits/A_X_train.csv").exists());
    assert!(!root.join("splits/A_y_test.csv").exists());
}

#[test]
fn test_outlier_capping_bounds_and_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    let mut text = String::from_utf8(dataset(20, &[])).unwrap();
    text.push_str("1000,60\n");
    wb.upload("A.csv", text.as_bytes()).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();

    let inverted = wb.handle_outliers(&OutlierParams {
        column: "x".into(),
        method: OutlierMethod::Capping {
            lower: 60.0,
            upper: 40.0,
        },
    });
    assert!(matches!(
        inverted,
        Err(PipelineError::InvalidParameter { .. })
    ));
    // a rejected request touches nothing
    assert!(wb.processing_path().unwrap().ends_with("uploads/A.csv"));
    assert!(root.join("splits/A_X_train.csv").exists());

    let handled = wb
        .handle_outliers(&OutlierParams {
            column: "x".into(),
            method: OutlierMethod::Iqr,
        })
        .unwrap();
    assert_eq!(handled.report.rows_removed, 1);
    assert_eq!(handled.rows, 20);
    assert!(handled.output.ends_with("cleaned/A_cleaned.csv"));
    assert!(wb
        .processing_path()
        .unwrap()
        .ends_with("cleaned/A_cleaned.csv"));
    assert!(!root.join("splits/A_X_train.csv").exists());
}

#[test]
fn test_stage_inputs_follow_active_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[3])).unwrap();
    fill_x(&mut wb);
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();
    let a_train = std::fs::read(root.join("splits/A_X_train.csv")).unwrap();

    wb.upload("B.csv", &dataset(12, &[])).unwrap();
    let explored = wb.explore(false).unwrap();
    assert!(explored.source.ends_with("uploads/B.csv"));
    assert_eq!(explored.summary.overview.rows, 12);

    wb.save_xy(&["x".to_string()], "y").unwrap();
    let split = wb.split(&random(0.25)).unwrap();
    assert_eq!(split.train_rows + split.test_rows, 12);
    assert!(root.join("splits/B_X_train.csv").exists());
    // A's outputs are left alone
    assert_eq!(
        std::fs::read(root.join("splits/A_X_train.csv")).unwrap(),
        a_train
    );

    wb.switch_dataset("A.csv").unwrap();
    let back = wb.explore(false).unwrap();
    assert!(back.source.ends_with("uploads/A.csv"));
    assert_eq!(back.summary.overview.rows, 20);
}

#[test]
fn test_test_split_prediction_ignores_later_rescale() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    ready_to_train(&mut wb);
    let trained = wb.train(&linear()).unwrap();

    let before = wb.predict(&trained.model_id, PredictSource::Test).unwrap();
    assert_eq!(before.metrics, Some(trained.metrics));

    // the model keeps its own scaler; new scaled files must not leak in
    wb.scale(ScalerKind::Minmax).unwrap();
    let after = wb.predict(&trained.model_id, PredictSource::Test).unwrap();
    assert_eq!(after.metrics, before.metrics);
}

#[test]
fn test_rejected_upload_leaves_no_input_copy() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    ready_to_train(&mut wb);
    let trained = wb.train(&linear()).unwrap();

    let bad = PredictSource::Upload {
        name: "bad.csv".into(),
        bytes: b"x\n1\nabc\n".to_vec(),
    };
    assert!(wb.predict(&trained.model_id, bad).is_err());
    assert!(files_with_prefix(&root.join("tmp_uploads"), "").is_empty());
    assert!(files_with_prefix(&root.join("predictions"), "").is_empty());

    let good = PredictSource::Upload {
        name: "good.csv".into(),
        bytes: b"x\n1\n2\n".to_vec(),
    };
    let result = wb.predict(&trained.model_id, good).unwrap();
    let input = result.input.unwrap();
    assert!(input.starts_with("tmp_uploads/"));
    assert!(root.join(&input).exists());

    wb.delete_datasets(&["A.csv".to_string()]).unwrap();
    assert!(!root.join(&input).exists());
}

#[test]
fn test_split_survives_undeletable_scaled_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[])).unwrap();
    wb.save_xy(&["x".to_string()], "y").unwrap();
    wb.split(&random(0.25)).unwrap();
    wb.scale(ScalerKind::Standard).unwrap();

    // a directory in place of a scaled split cannot be removed as a file
    let blocker = root.join("splits/A_X_train_scaled.csv");
    std::fs::remove_file(&blocker).unwrap();
    std::fs::create_dir(&blocker).unwrap();

    let split = wb.split(&random(0.25)).unwrap();
    assert_eq!((split.train_rows, split.test_rows), (15, 5));
    assert!(blocker.is_dir());
    assert!(!root.join("splits/A_scaler.json").exists());
}

#[test]
fn test_every_model_key_trains_and_predicts() {
    let dir = tempfile::tempdir().unwrap();
    let mut wb = open(dir.path());
    ready_to_train(&mut wb);

    for key in [ModelKey::Ridge, ModelKey::Dtr, ModelKey::Rf, ModelKey::Svr] {
        let trained = wb.train(&train_with(key)).unwrap();
        assert_eq!(trained.model_key, key);
        assert!(trained.model_id.starts_with(&format!("A_{}_", key.as_str())));
        assert_eq!(trained.target_scaled, key == ModelKey::Svr);

        let upload = PredictSource::Upload {
            name: "fresh.csv".into(),
            bytes: b"x\n1\n2\n3\n".to_vec(),
        };
        let predicted = wb.predict(&trained.model_id, upload).unwrap();
        assert_eq!(predicted.rows, 3);
    }
    assert_eq!(wb.list_models(Some("A")).unwrap().len(), 4);
}

#[test]
fn test_plot_data_written_and_cascaded() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut wb = open(root);
    wb.upload("A.csv", &dataset(20, &[])).unwrap();

    let shown = wb
        .visualize(&VisualizeParams {
            columns: vec!["x".into(), "y".into()],
            plots: vec![PlotKind::Scatter, PlotKind::Histogram],
            limit: 100,
        })
        .unwrap();
    assert_eq!(shown.plot, "plots/A_visualize_x-y.json");
    assert_eq!(shown.data.histograms.len(), 2);
    assert!(root.join(&shown.plot).exists());

    let compared = wb
        .compare_by_target(&CompareParams {
            target: "y".into(),
            features: vec!["x".into()],
            lower: 25.0,
            upper: 75.0,
        })
        .unwrap();
    assert_eq!(compared.plot, "plots/A_compare_y.json");
    assert_eq!(compared.data.features[0].lower.rows, 5);

    wb.delete_datasets(&["A.csv".to_string()]).unwrap();
    assert!(files_with_prefix(&root.join("plots"), "A_").is_empty());
}
