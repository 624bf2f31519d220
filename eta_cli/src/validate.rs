//! `eta validate`: accuracy/precision table from a gaze log and a target schedule.

use std::path::Path;

use eta_core::error::EtaError;
use eta_core::{AccuracyStatistic, ValidationAnalyzer, ValidationReport};

const CSV_HEADER: [&str; 17] = [
    "group",
    "grid_row",
    "grid_col",
    "target_x",
    "target_y",
    "target_rel_x",
    "target_rel_y",
    "median_x",
    "median_y",
    "mean_x",
    "mean_y",
    "median_magnitude",
    "median_phase",
    "spread_from_target",
    "spread_from_median",
    "sample_count",
    "stay_duration_ms",
];

fn csv_row(r: &AccuracyStatistic) -> Vec<String> {
    let f = |v: f64| format!("{v:.6}");
    vec![
        r.group.to_string(),
        r.grid_position[0].to_string(),
        r.grid_position[1].to_string(),
        f(r.target_position[0]),
        f(r.target_position[1]),
        f(r.target_relative[0]),
        f(r.target_relative[1]),
        f(r.median_position[0]),
        f(r.median_position[1]),
        f(r.mean_position[0]),
        f(r.mean_position[1]),
        f(r.median_magnitude),
        f(r.median_phase),
        f(r.spread_from_target),
        f(r.spread_from_median),
        r.sample_count.to_string(),
    ]
}

/// Write the table as CSV. Errors map to `EtaError::Persistence`.
pub fn write_csv(path: &Path, rows: &[AccuracyStatistic], stay_duration_ms: Option<f64>) -> eyre::Result<()> {
    let persistence = |e: &dyn std::fmt::Display| {
        eyre::Report::new(EtaError::Persistence(format!("write {}: {e}", path.display())))
    };
    let mut w = csv::Writer::from_path(path).map_err(|e| persistence(&e))?;
    w.write_record(CSV_HEADER).map_err(|e| persistence(&e))?;
    let stay = stay_duration_ms.map(|d| format!("{d}")).unwrap_or_default();
    for r in rows {
        let mut rec = csv_row(r);
        rec.push(stay.clone());
        w.write_record(&rec).map_err(|e| persistence(&e))?;
    }
    w.flush().map_err(|e| persistence(&e))?;
    Ok(())
}

fn print_table(report: &ValidationReport) {
    println!(
        "{:>5} {:>9} {:>17} {:>17} {:>10} {:>8} {:>10} {:>10} {:>6}",
        "group", "grid", "target px", "median px", "offset px", "phase", "sd target", "sd median", "n"
    );
    for r in &report.rows {
        println!(
            "{:>5} {:>9} {:>17} {:>17} {:>10.2} {:>8.3} {:>10.2} {:>10.2} {:>6}",
            r.group,
            format!("({},{})", r.grid_position[0], r.grid_position[1]),
            format!("({:.1},{:.1})", r.target_position[0], r.target_position[1]),
            format!("({:.1},{:.1})", r.median_position[0], r.median_position[1]),
            r.median_magnitude,
            r.median_phase,
            r.spread_from_target,
            r.spread_from_median,
            r.sample_count
        );
    }
    println!(
        "{} of {} targets populated from {} gaze samples ({} dropped)",
        report.rows.len(),
        report.targets,
        report.gaze_samples,
        report.dropped_samples
    );
}

pub fn run_validate(gaze: &Path, targets: &Path, csv: Option<&Path>, json: bool) -> eyre::Result<ValidationReport> {
    let report = ValidationAnalyzer::new().analyze_files(gaze, targets);
    for issue in &report.issues {
        tracing::warn!(%issue, "validation input issue");
    }

    if json {
        for r in &report.rows {
            println!("{}", serde_json::to_string(r)?);
        }
    } else {
        print_table(&report);
    }

    if let Some(out) = csv {
        write_csv(out, &report.rows, report.stay_duration_ms)?;
        tracing::info!(path = %out.display(), rows = report.rows.len(), "validation table written");
    }
    Ok(report)
}
