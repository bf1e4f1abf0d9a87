use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Local;

use crate::cli::RenderArgs;
use crate::export;

/// Rebuild the HTML report from a previous CSV export, no network involved.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let out_dir = PathBuf::from(&args.out);
    let csv_path = match &args.csv {
        Some(path) => PathBuf::from(path),
        None => newest_export(&out_dir)?,
    };
    tracing::info!(csv = %csv_path.display(), "rendering html from csv");

    let rows = read_rows(&csv_path)?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;
    let html_path = out_dir.join(export::timestamped_name("html", Local::now()));
    export::write_html(&html_path, &rows)?;

    println!("HTML exported to {}", html_path.display());
    Ok(())
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open csv export: {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("read csv row: {}", path.display()))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}

/// Most recent export in the output directory. The timestamp sits in the file
/// name, so lexicographic order is chronological order.
fn newest_export(dir: &Path) -> anyhow::Result<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read output dir: {}", dir.display()))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read output dir entry: {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with("stephen_king_works_") && name.ends_with(".csv") {
            candidates.push(entry.path());
        }
    }

    candidates.sort();
    candidates.pop().ok_or_else(|| {
        anyhow::anyhow!(
            "no csv export found in {}; run `kingworks scrape` first or pass --csv",
            dir.display()
        )
    })
}
