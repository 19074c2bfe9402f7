use eyre::{Result, WrapErr};
use ndarray::Array2;
use ndarray_csv::Array2Reader;
use std::fs::File;
use std::path::Path;

/// Read the observed titre matrix from a headerless CSV file
///
/// Each row holds the titres of one individual against one measured strain, one column per
/// time point. Rows are ordered by group, then measured strain, then individual.
pub fn read_titres(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let file = File::open(path).wrap_err_with(|| format!("Unable to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(file);
    let data: Array2<f64> = reader
        .deserialize_array2_dynamic()
        .wrap_err_with(|| format!("Unable to parse titres in {}", path.display()))?;
    tracing::info!(
        "Datafile contains {} titre series over {} time points",
        data.nrows(),
        data.ncols()
    );
    Ok(data)
}
