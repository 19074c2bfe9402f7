use crate::prelude::*;
use ndarray::{array, Array1};

fn single_group() -> FlatDesign {
    FlatDesign {
        groups: vec![1],
        individuals: vec![2],
        strains: vec![1],
        exposure_types: vec![1; 5],
        exposure_strains: vec![1; 5],
        measured_strains: vec![1; 5],
        exposure_orders: vec![1; 5],
        exposure_primes: vec![0; 5],
        exposure_indices: vec![1],
        cr_indices: vec![4],
        par_type_indices: vec![0],
        order_indices: vec![3],
        exposure_lengths: vec![0, 1],
        par_lengths: vec![0, 1],
        cr_lengths: vec![0, 1],
    }
}

/// Constant trajectory at the first kinetics parameter
fn peak_model() -> Model {
    Model::new(|p: &ExposureParameters, t: &Array1<f64>| Array1::from_elem(t.len(), p.kinetics()[0]))
}

#[test]
fn read_settings() {
    let settings = settings::read("src/tests/config.toml").unwrap();
    assert_eq!(settings.paths.data, "src/tests/titres.csv");
    assert_eq!(settings.paths.output, None);
    assert!(!settings.config.parallel);
    assert!(!settings.config.cache);
    assert_eq!(settings.config.log_level, "warn");
    assert_eq!(settings.error, ObservationError::new(0.8, 0.15, 8).unwrap());
}

#[test]
fn settings_round_trip_through_json() {
    let settings = settings::read("src/tests/config.toml").unwrap();
    let json = serde_json::to_string(&settings).unwrap();
    assert!(json.contains("\"max_titre\":8"));
    let parsed: settings::Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, settings);
}

#[test]
fn evaluate_from_settings() {
    let mut settings = settings::read("src/tests/config.toml").unwrap();
    let folder = std::env::temp_dir().join("abkinetics_evaluate_from_settings");
    std::fs::create_dir_all(&folder).unwrap();
    let output = folder.join("trajectories.csv");
    settings.paths.output = Some(output.to_string_lossy().to_string());

    let ln = evaluate(
        settings,
        &single_group(),
        array![0.0, 1.0, 2.0],
        &[4.0, 0.0, 0.0, 1.0, 1.0],
        peak_model(),
    )
    .unwrap();
    let expected = 5.0 * 0.8f64.ln() + 0.075f64.ln();
    assert!((ln - expected).abs() < 1e-12);

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 4);

    let json = folder.join("settings.json");
    let saved: settings::Settings =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(saved.error.max_titre, 8);
    std::fs::remove_dir_all(&folder).unwrap();
}

#[test]
fn logger_can_be_set_up_twice() {
    let settings = settings::read("src/tests/config.toml").unwrap();
    assert!(logger::setup_log(&settings).is_ok());
    assert!(logger::setup_log(&settings).is_ok());
}

#[test]
fn sequence_entrypoint_matches_kernel() {
    let ln = evaluate_sequence_log_likelihood(&[4.0, -3.0, 9.0], &[4.0, 0.0, 7.0], [0.8, 0.15, 8.0]);
    let expected = evaluate_observation_probability(4, 4, 0.8, 0.15, 8).ln()
        + evaluate_observation_probability(0, 0, 0.8, 0.15, 8).ln()
        + evaluate_observation_probability(8, 7, 0.8, 0.15, 8).ln();
    assert!((ln - expected).abs() < 1e-12);
}

#[test]
fn posterior_entrypoint_rejects_short_parameters() {
    let result = evaluate_posterior(
        &[4.0, 0.0],
        &array![0.0, 1.0, 2.0],
        &single_group(),
        &array![[4.0, 4.0, 4.0], [4.0, 4.0, 4.0]],
        ObservationError::new(0.8, 0.15, 8).unwrap(),
        peak_model(),
    );
    assert!(result.is_err());
}
