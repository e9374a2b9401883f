use tabular::{
    encode, fill_missing, split_indices, Encoding, Frame, Metrics, MissingStrategy, ModelKey,
    Regressor, Scaler, ScalerKind, SplitMethod,
};

/// `price = 2 * size + 5 [city = b] + 10 [city = c]`, size missing on row 4.
fn listings() -> Frame {
    let mut text = String::from("size,city,price\n");
    for i in 1..=12 {
        let city = ["a", "b", "c"][i % 3];
        let bump = match city {
            "b" => 5,
            "c" => 10,
            _ => 0,
        };
        let size = i * 10;
        if i == 4 {
            text.push_str(&format!(",{city},{}\n", 2 * size + bump));
        } else {
            text.push_str(&format!("{size},{city},{}\n", 2 * size + bump));
        }
    }
    Frame::parse_csv(&text).unwrap()
}

#[test]
fn test_clean_encode_split_scale_fit() {
    let mut frame = listings();
    fill_missing(&mut frame, "size", &MissingStrategy::Drop).unwrap();
    assert_eq!(frame.n_rows(), 11);

    encode(&mut frame, "city", Encoding::Onehot).unwrap();
    assert_eq!(
        frame.columns(),
        &["size", "price", "city_a", "city_b", "city_c"]
    );

    let idx = split_indices(frame.n_rows(), &SplitMethod::Sequential { test_size: 0.25 }).unwrap();
    assert_eq!((idx.train.len(), idx.test.len()), (8, 3));

    let features: Vec<String> = ["size", "city_b", "city_c"].map(String::from).to_vec();
    let target = vec!["price".to_string()];
    let train = frame.take_rows(&idx.train);
    let test = frame.take_rows(&idx.test);

    let x_train = train.numeric_matrix(&features).unwrap();
    let x_test = test.numeric_matrix(&features).unwrap();
    let y_train = train.numeric_matrix(&target).unwrap().remove(0);
    let y_test = test.numeric_matrix(&target).unwrap().remove(0);

    let scaler = Scaler::fit(ScalerKind::Standard, features.clone(), &x_train).unwrap();
    let model = Regressor::fit(
        ModelKey::Linear,
        0.0,
        &scaler.transform(&x_train).unwrap(),
        &y_train,
    )
    .unwrap();
    let predicted = model.predict(&scaler.transform(&x_test).unwrap()).unwrap();
    let metrics = Metrics::compute(&y_test, &predicted).unwrap();
    assert!((metrics.r2 - 1.0).abs() < 1e-9);
    assert!(metrics.rmse.abs() < 1e-9);
}

#[test]
fn test_csv_round_trip_keeps_untouched_cells() {
    let text = "name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\nLee,\n";
    let frame = Frame::parse_csv(text).unwrap();
    assert_eq!(frame.n_rows(), 2);
    assert_eq!(frame.column("name").unwrap(), vec!["Smith, J", "Lee"]);
    let again = Frame::parse_csv(&frame.to_csv().unwrap()).unwrap();
    assert_eq!(again, frame);
}
