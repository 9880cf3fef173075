use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;

use crate::models::{AppMetadata, NormalizedReview};

pub const REVIEW_COLUMNS: [&str; 5] =
    ["review_text", "rating", "date", "bank_app_name", "source"];
pub const METADATA_COLUMNS: [&str; 7] = [
    "bank_code",
    "app_id",
    "app_name",
    "installs",
    "developer",
    "score",
    "description",
];

pub fn write_reviews(path: &Path, rows: &[NormalizedReview]) -> Result<()> {
    write_table(path, &REVIEW_COLUMNS, rows)
}

pub fn write_metadata(path: &Path, rows: &[AppMetadata]) -> Result<()> {
    write_table(path, &METADATA_COLUMNS, rows)
}

/// Writes a header plus one record per row, replacing `path` only once the
/// whole table is on disk.
fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }

    let tmp = tmp_path(path);
    let written = write_csv(&tmp, columns, rows).and_then(|()| {
        fs::rename(&tmp, path)
            .with_context(|| format!("move {} to {}", tmp.display(), path.display()))
    });
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_csv<T: Serialize>(tmp: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let file = File::create(tmp).with_context(|| format!("create output {}", tmp.display()))?;
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    wtr.write_record(columns)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
