use std::error::Error;
use std::path::Path;

use crate::models::{Decomposition, ForecastFrame};
use crate::series::ForecastInput;

fn ensure_parent_exists(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ds,trend,weekly,yearly,yhat,yhat_lower,yhat_upper
pub fn write_forecast_csv(path: &Path, frame: &ForecastFrame) -> Result<(), Box<dyn Error>> {
    ensure_parent_exists(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in &frame.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} forecast rows to {}", frame.len(), path.display());
    Ok(())
}

// ds,y
pub fn write_history_csv(path: &Path, input: &ForecastInput) -> Result<(), Box<dyn Error>> {
    ensure_parent_exists(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in &input.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} history rows to {}", input.len(), path.display());
    Ok(())
}

// Two files next to each other: <stem>-weekly.csv and <stem>-yearly.csv
pub fn write_decomposition_csv(
    dir: &Path,
    stem: &str,
    decomposition: &Decomposition,
) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;

    let mut weekly = csv::Writer::from_path(dir.join(format!("{}-weekly.csv", stem)))?;
    for effect in &decomposition.weekly {
        weekly.serialize(effect)?;
    }
    weekly.flush()?;

    let mut yearly = csv::Writer::from_path(dir.join(format!("{}-yearly.csv", stem)))?;
    for effect in &decomposition.yearly {
        yearly.serialize(effect)?;
    }
    yearly.flush()?;
    Ok(())
}
