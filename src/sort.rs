use std::path::{Path, PathBuf};

use log::{error, info};

use crate::{
    error::{Error, Result},
    table::{Table, list_files},
};

#[derive(Debug, Default)]
pub struct SortSummary {
    pub sorted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

/// Sorts every CSV file directly inside `folder` in place. A file that fails
/// is reported and skipped; the others are still sorted.
pub fn sort_dir(folder: &Path) -> Result<SortSummary> {
    let mut summary = SortSummary::default();

    for path in list_files(folder, &["csv"])? {
        info!("Sorting {path:?}");
        match sort_file(&path) {
            Ok(()) => summary.sorted.push(path),
            Err(e) => {
                error!("Failed to sort {path:?}: {e}");
                summary.failed.push((path, e));
            }
        }
    }

    info!("Sorted {} files, {} failed", summary.sorted.len(), summary.failed.len());
    Ok(summary)
}

/// Sorts the rows of one file by all of its columns, left to right.
pub fn sort_file(path: &Path) -> Result<()> {
    let mut table = Table::read(path)?;
    table.sort_by_all_columns();
    table.write(path)
}
