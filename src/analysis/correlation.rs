use crate::analysis::prepare;
use crate::processing::error::ProcessingError;
use crate::processing::extract::f64_values;
use crate::types::records::columns;
use log::info;
use polars::prelude::*;

const VARIABLES: [&str; 3] = [columns::TMAX_F, columns::TMIN_F, columns::ENERGY_MWH];

/// Pearson correlation over the rows where both values are present.
///
/// `None` when fewer than two such rows exist or either side has zero variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// 3×3 Pearson matrix of `tmax_f`, `tmin_f` and `energy_mwh`.
///
/// Columns are `variable, tmax_f, tmin_f, energy_mwh`, one row per variable.
pub fn compute_correlation(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    let df = prepare(df)?;
    let values = VARIABLES
        .iter()
        .map(|name| f64_values(&df, "merged", name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut table: Vec<Column> = vec![Column::new("variable".into(), VARIABLES.to_vec())];
    for (j, name) in VARIABLES.iter().enumerate() {
        let cells: Vec<Option<f64>> = (0..VARIABLES.len())
            .map(|i| {
                if i == j {
                    // A variable with any spread correlates perfectly with itself.
                    pearson(&values[i], &values[j]).map(|_| 1.0)
                } else {
                    pearson(&values[i], &values[j])
                }
            })
            .collect();
        table.push(Column::new((*name).into(), cells));
    }

    info!("Computed correlation matrix over {} rows", df.height());
    Ok(DataFrame::new(table)?)
}
