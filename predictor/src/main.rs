use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};

use brentlib::export::{write_decomposition_csv, write_forecast_csv, write_history_csv};
use brentlib::ipea::HttpPageSource;
use brentlib::logging;
use brentlib::models::ForecastModel;
use brentlib::util::{read_settings, DEFAULT_SETTINGS_PATH};
use brentlib::Predictor;

struct Args {
    settings: String,
    export: Option<PathBuf>,
    json: bool,
    dates: Vec<String>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--settings <settings.json>] [--export <dir>] [--json] [YYYY-MM-DD ...]\n\
         Without dates, target dates are read from stdin, one per line.",
        program
    )
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "predictor".to_string());

    let mut parsed = Args {
        settings: DEFAULT_SETTINGS_PATH.to_string(),
        export: None,
        json: false,
        dates: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-s" | "--settings" => {
                parsed.settings = args.next().context("Missing settings path")?;
            }
            "-e" | "--export" => {
                parsed.export = Some(PathBuf::from(args.next().context("Missing export directory")?));
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => {
                eprintln!("{}", usage(&program));
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("Unknown arg: {}\n{}", other, usage(&program)),
            date => parsed.dates.push(date.to_string()),
        }
    }
    Ok(parsed)
}

// Returns false when the request failed, so the caller can pick an exit code
async fn answer(predictor: &Predictor, requested: &str, args: &Args) -> bool {
    let prediction = match predictor.predict(requested).await {
        Ok(prediction) => prediction,
        Err(e) => {
            log::error!("Prediction for {} failed: {}", requested, e);
            eprintln!("Error: {}", e);
            return false;
        }
    };

    if args.json {
        let body = serde_json::json!({
            "date": prediction.target_date,
            "horizon": prediction.horizon,
            "outcome": prediction.outcome,
            "message": prediction.message,
            "report": prediction.report,
        });
        println!("{}", body);
    } else {
        println!("{}", prediction.message);
    }

    if let Some(dir) = &args.export {
        let date = prediction.target_date.format("%Y-%m-%d").to_string();
        let exported = write_forecast_csv(&dir.join(format!("forecast-{}.csv", date)), &prediction.frame)
            .and_then(|_| write_history_csv(&dir.join("history.csv"), &prediction.history))
            .and_then(|_| {
                let decomposition = prediction.model.decomposition()?;
                write_decomposition_csv(dir, &format!("components-{}", date), &decomposition)
            });
        if let Err(e) = exported {
            log::error!("Export to {} failed: {}", dir.display(), e);
            eprintln!("Error: export failed: {}", e);
            return false;
        }
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let settings = read_settings(&args.settings)
        .map_err(|e| anyhow!("Failed to read settings from {}: {}", args.settings, e))?;

    if let Some(dir) = std::path::Path::new(settings.log_path()).parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Creating log directory {}", dir.display()))?;
    }
    logging::configure_logger(settings.log_path())
        .map_err(|e| anyhow!("Failed to configure logger: {}", e))?;
    log::info!("Using source {}", settings.source.url);

    let source = HttpPageSource::new(settings.source.clone())?;
    let predictor = Predictor::new(Arc::new(source), settings);

    let mut all_ok = true;
    if args.dates.is_empty() {
        // Serve requests from stdin until EOF; the cache lives as long as the process
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            match line {
                "" => continue,
                "quit" | "exit" => break,
                date => all_ok &= answer(&predictor, date, &args).await,
            }
        }
    } else {
        for date in &args.dates {
            all_ok &= answer(&predictor, date, &args).await;
        }
    }

    log::info!("Served {} distinct dates", predictor.cache().len());
    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}
