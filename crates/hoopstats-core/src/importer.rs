// Yearly CSV discovery and import.
//
// Files are named `NBA_<yyyy>_per_game_stats.csv`. They are processed in
// ascending year order, one transaction per file: a failure stops the run but
// leaves every earlier file committed.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::db::Database;
use crate::mapper::{map_row, HeaderIndex, MapError, NumericPolicy, SourceRow};
use crate::record::StatRecord;
use crate::schema::SchemaMode;

/// Glob matched inside the data directory.
pub const SOURCE_GLOB: &str = "NBA_*.csv";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("data directory not found: {0}")]
    MissingDataDir(PathBuf),

    #[error("invalid glob pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} row {row}: {source}")]
    Row {
        path: String,
        row: usize,
        source: MapError,
    },
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A yearly export found in the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub year: i32,
}

/// Outcome of one committed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub year: i32,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: Vec<FileReport>,
    /// Files that matched the glob but carried no year in their name.
    pub skipped: Vec<PathBuf>,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"NBA_(\d{4})_per_game_stats\.csv").expect("filename pattern is valid")
    })
}

/// Year embedded in an export's file name, e.g. `NBA_2024_per_game_stats.csv` -> 2024.
pub fn year_from_filename(name: &str) -> Option<i32> {
    let caps = filename_pattern().captures(name)?;
    caps[1].parse().ok()
}

/// Find every `NBA_*.csv` under `data_dir`, keep those whose name carries a
/// year, and sort them by ascending year. Returns the kept files and the
/// skipped paths.
pub fn discover_source_files(data_dir: &Path) -> Result<(Vec<SourceFile>, Vec<PathBuf>), ImportError> {
    if !data_dir.is_dir() {
        return Err(ImportError::MissingDataDir(data_dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/{SOURCE_GLOB}",
        glob::Pattern::escape(&data_dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern).map_err(|e| ImportError::Pattern {
        pattern: pattern.clone(),
        source: e,
    })?;

    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let year = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(year_from_filename);
        match year {
            Some(year) => files.push(SourceFile { path, year }),
            None => {
                warn!("could not extract year from {}, skipping", path.display());
                skipped.push(path);
            }
        }
    }

    files.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.path.cmp(&b.path)));
    Ok((files, skipped))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn load_records_from_reader<R: Read>(
    rdr: R,
    year: i32,
    policy: NumericPolicy,
    path: &str,
) -> Result<Vec<StatRecord>, ImportError> {
    // Short rows are accepted; their trailing cells map to null.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = reader.headers().map_err(|e| ImportError::Csv {
        path: path.to_string(),
        source: e,
    })?;
    let index = HeaderIndex::new(headers);

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let raw = result.map_err(|e| ImportError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        let row = SourceRow::new(&index, &raw);
        let record = map_row(&row, year, policy).map_err(|e| ImportError::Row {
            path: path.to_string(),
            row: idx + 1,
            source: e,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read and map every row of one export.
pub fn load_records(path: &Path, year: i32, policy: NumericPolicy) -> Result<Vec<StatRecord>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_records_from_reader(file, year, policy, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Import driver
// ---------------------------------------------------------------------------

/// Drives discovery, mapping, and persistence against one open database.
pub struct Importer<'a> {
    db: &'a Database,
    data_dir: PathBuf,
    mode: SchemaMode,
    policy: NumericPolicy,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database, config: &ImportConfig) -> Self {
        Self {
            db,
            data_dir: PathBuf::from(&config.data_dir),
            mode: config.schema_mode,
            policy: config.numeric_policy,
        }
    }

    /// Import one file in a single transaction. Returns the rows written.
    pub fn import_file(&self, source: &SourceFile) -> anyhow::Result<usize> {
        let records = load_records(&source.path, source.year, self.policy)?;
        self.db
            .write_records(self.mode, &records)
            .with_context(|| format!("failed to store {}", source.path.display()))
    }

    /// Import every discovered file in year order. The first failure aborts
    /// the remaining files; files already committed stay committed.
    pub fn run(&self) -> anyhow::Result<ImportSummary> {
        let (sources, skipped) = discover_source_files(&self.data_dir)?;
        info!(
            "Found {} CSV files to import in {}",
            sources.len(),
            self.data_dir.display()
        );
        if sources.is_empty() {
            warn!("no {} files found in {}", SOURCE_GLOB, self.data_dir.display());
        }

        let mut summary = ImportSummary {
            files: Vec::with_capacity(sources.len()),
            skipped,
        };

        for source in &sources {
            info!("Processing {} (year {})", source.path.display(), source.year);
            let rows = self
                .import_file(source)
                .with_context(|| format!("import stopped at {}", source.path.display()))?;
            info!("Completed {} ({} rows)", source.path.display(), rows);
            summary.files.push(FileReport {
                path: source.path.clone(),
                year: source.year,
                rows,
            });
        }

        info!(
            "Import complete: {} files, {} rows",
            summary.files.len(),
            summary.total_rows()
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
