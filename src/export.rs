// 📤 Spreadsheet Export
// Writes the rows a view currently shows (after filtering) as CSV.

use crate::entity::Entity;
use crate::error::Result;
use crate::view::EntityListView;
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["ID", "Name", "Status", "Category", "Web"];

/// Write a header plus one record per row. Returns the row count.
pub fn write_rows<W: Write>(rows: &[Entity], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for entity in rows {
        let id = entity.id.to_string();
        wtr.write_record([
            id.as_str(),
            entity.name.as_str(),
            entity.status.label(),
            entity.category.as_deref().unwrap_or(""),
            entity.web.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(rows.len())
}

/// `<list-route>_<YYYY-MM-DD>.csv` in `dir`
pub fn export_file_name(view: &EntityListView) -> String {
    format!(
        "{}_{}.csv",
        view.list().route(),
        Local::now().format("%Y-%m-%d")
    )
}

pub fn export_view(view: &EntityListView, dir: &Path) -> Result<PathBuf> {
    let rows = view.rows();
    let path = dir.join(export_file_name(view));
    let file = File::create(&path)?;
    let written = write_rows(&rows, file)?;

    tracing::info!(list = view.list().route(), rows = written, path = %path.display(), "export written");
    Ok(path)
}

// ============================================================================
// TESTS
// ============================================================================
