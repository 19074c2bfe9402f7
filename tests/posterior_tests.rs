use abkinetics::prelude::*;
use eyre::Result;
use ndarray::{array, Array1, Array2};

/// One group, one strain, one exposure
///
/// Parameter layout: 0 peak, 1 infection time, 2 order modifier, 3 cross-reactivity
fn single_exposure(individuals: usize) -> FlatDesign {
    FlatDesign {
        groups: vec![1],
        individuals: vec![individuals],
        strains: vec![1],
        exposure_types: vec![1; 4],
        exposure_strains: vec![1; 4],
        measured_strains: vec![1; 4],
        exposure_orders: vec![1; 4],
        exposure_primes: vec![0; 4],
        exposure_indices: vec![1],
        cr_indices: vec![3],
        par_type_indices: vec![0],
        order_indices: vec![2],
        exposure_lengths: vec![0, 1],
        par_lengths: vec![0, 1],
        cr_lengths: vec![0, 1],
    }
}

/// Returns the peak parameter scaled by cross-reactivity and order modifier from the infection time on
fn boost_model() -> Model {
    Model::new(|p: &ExposureParameters, t: &Array1<f64>| {
        let level = p.kinetics()[0] * p.cross_reactivity() * p.modifier();
        t.mapv(|t| if t >= p.infection_time() { level } else { 0.0 })
    })
}

fn constant_model(value: f64) -> Model {
    Model::new(move |_: &ExposureParameters, t: &Array1<f64>| Array1::from_elem(t.len(), value))
}

#[test]
fn exact_titres_score_s() -> Result<()> {
    let ln = evaluate_posterior(
        &[0.0, 0.0, 1.0, 1.0],
        &array![0.0, 1.0, 2.0],
        &single_exposure(1),
        &array![[4.0, 4.0, 4.0]],
        ObservationError::new(0.8, 0.15, 8)?,
        constant_model(4.0),
    )?;
    assert!((ln - 3.0 * 0.8f64.ln()).abs() < 1e-12);
    Ok(())
}

#[test]
fn adjacent_titres_score_half_ea() -> Result<()> {
    let ln = evaluate_posterior(
        &[0.0, 0.0, 1.0, 1.0],
        &array![0.0, 1.0, 2.0],
        &single_exposure(1),
        &array![[5.0, 5.0, 5.0]],
        ObservationError::new(0.8, 0.15, 8)?,
        constant_model(4.0),
    )?;
    assert!((ln - 3.0 * 0.075f64.ln()).abs() < 1e-12);
    Ok(())
}

#[test]
fn exposure_terms_reach_the_solver() -> Result<()> {
    // Peak 6, infection at t = 1, modifier 0.5, cross-reactivity 1 gives [0, 3, 3]
    let error = ObservationError::new(0.8, 0.15, 8)?;
    let ln = evaluate_posterior(
        &[6.0, 1.0, 0.5, 1.0],
        &array![0.0, 1.0, 2.0],
        &single_exposure(1),
        &array![[0.0, 3.0, 3.0]],
        error,
        boost_model(),
    )?;
    let expected = error.probability(0, 0).ln() + 2.0 * error.probability(3, 3).ln();
    assert!((ln - expected).abs() < 1e-12);
    Ok(())
}

#[test]
fn groups_consume_consecutive_rows() -> Result<()> {
    // Two groups with individuals [2, 1]; group 2 is exposed to a lower peak
    // Parameter layout: 0 peak, 1 infection time (group 1), 2 modifier, 3 cross-reactivity,
    // 4 peak for the second exposure type, 5 infection time (group 2)
    let flat = FlatDesign {
        groups: vec![1, 2],
        individuals: vec![2, 1],
        strains: vec![1],
        exposure_types: vec![1, 1, 1, 1, 1, 2],
        exposure_strains: vec![1; 6],
        measured_strains: vec![1; 6],
        exposure_orders: vec![1; 6],
        exposure_primes: vec![0; 6],
        exposure_indices: vec![1, 5],
        cr_indices: vec![3],
        par_type_indices: vec![0, 4],
        order_indices: vec![2],
        exposure_lengths: vec![0, 1, 2],
        par_lengths: vec![0, 1, 2],
        cr_lengths: vec![0, 1],
    };
    let pars = [6.0, 0.0, 1.0, 1.0, 2.0, 0.0];
    let times = array![0.0, 1.0];
    let error = ObservationError::new(0.8, 0.15, 8)?;

    let design = Design::resolve(&flat, pars.len())?;
    let evaluator = PosteriorEvaluator::new(
        design,
        times,
        array![[6.0, 6.0], [6.0, 5.0], [2.0, 2.0]],
        error,
        boost_model(),
    )?;

    let trajectories = evaluator.trajectories(&pars)?;
    assert_eq!(trajectories, array![[6.0, 6.0], [2.0, 2.0]]);

    let s = error.probability(6, 6).ln();
    let adjacent = error.probability(6, 5).ln();
    let expected = 2.0 * s + (s + adjacent) + 2.0 * s;
    assert!((evaluator.evaluate(&pars)? - expected).abs() < 1e-12);

    // Swapping the group rows pairs the data with the wrong trajectory
    let swapped = PosteriorEvaluator::new(
        Design::resolve(&flat, pars.len())?,
        array![0.0, 1.0],
        array![[2.0, 2.0], [6.0, 6.0], [6.0, 5.0]],
        error,
        boost_model(),
    )?;
    assert!(swapped.evaluate(&pars)? < expected);
    Ok(())
}

#[test]
fn parallel_and_serial_agree() -> Result<()> {
    let flat = single_exposure(3);
    let pars = [5.0, 1.0, 1.0, 0.8];
    let times = array![0.0, 1.0, 2.0, 3.0];
    let data = Array2::from_shape_vec(
        (3, 4),
        vec![0.0, 4.0, 4.0, 3.0, 1.0, 4.0, 5.0, 4.0, 0.0, 3.0, 4.0, 8.0],
    )?;
    let error = ObservationError::new(0.7, 0.2, 8)?;

    let serial = PosteriorEvaluator::new(
        Design::resolve(&flat, 4)?,
        times.clone(),
        data.clone(),
        error,
        boost_model(),
    )?
    .with_parallel(false)
    .evaluate(&pars)?;
    let parallel = PosteriorEvaluator::new(Design::resolve(&flat, 4)?, times, data, error, boost_model())?
        .evaluate(&pars)?;
    assert_eq!(serial, parallel);
    assert!(serial.is_finite());
    Ok(())
}

#[test]
fn mismatched_data_is_rejected() -> Result<()> {
    let result = evaluate_posterior(
        &[0.0, 0.0, 1.0, 1.0],
        &array![0.0, 1.0, 2.0],
        &single_exposure(2),
        &array![[4.0, 4.0, 4.0]],
        ObservationError::new(0.8, 0.15, 8)?,
        constant_model(4.0),
    );
    assert!(result.is_err());
    Ok(())
}
