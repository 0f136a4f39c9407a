use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::domain::{ApplicationSubmission, Nic, Watchlist};

pub const APPLICATIONS_FILE: &str = "loan_applications.csv";
pub const WATCHLIST_FILE: &str = "kyc_watchlist.csv";

/// Supplies raw application records and the active watchlist.
///
/// Records are returned unvalidated; validation happens when a review is requested.
pub trait ApplicationSource: Send + Sync {
    fn list(&self, limit: usize) -> Result<Vec<ApplicationSubmission>, SourceError>;
    fn find(&self, application_id: &str) -> Result<Option<ApplicationSubmission>, SourceError>;
    fn watchlist(&self) -> Result<Watchlist, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("data file {} unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed data in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// CSV-backed source reading `loan_applications.csv` and `kyc_watchlist.csv`.
///
/// Files are re-read on every call so edits are picked up without a restart.
#[derive(Debug, Clone)]
pub struct CsvApplicationSource {
    applications_path: PathBuf,
    watchlist_path: PathBuf,
}

impl CsvApplicationSource {
    pub fn new(applications_path: impl Into<PathBuf>, watchlist_path: impl Into<PathBuf>) -> Self {
        Self {
            applications_path: applications_path.into(),
            watchlist_path: watchlist_path.into(),
        }
    }

    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(APPLICATIONS_FILE), data_dir.join(WATCHLIST_FILE))
    }

    fn load_applications(&self) -> Result<Vec<ApplicationSubmission>, SourceError> {
        let file =
            File::open(&self.applications_path).map_err(|source| SourceError::Unavailable {
                path: self.applications_path.clone(),
                source,
            })?;
        parse_applications(file).map_err(|source| SourceError::Malformed {
            path: self.applications_path.clone(),
            source,
        })
    }
}

impl ApplicationSource for CsvApplicationSource {
    fn list(&self, limit: usize) -> Result<Vec<ApplicationSubmission>, SourceError> {
        let mut records = self.load_applications()?;
        records.truncate(limit);
        Ok(records)
    }

    fn find(&self, application_id: &str) -> Result<Option<ApplicationSubmission>, SourceError> {
        let records = self.load_applications()?;
        Ok(records.into_iter().find(|record| {
            record
                .application_id
                .as_deref()
                .map(str::trim)
                == Some(application_id.trim())
        }))
    }

    fn watchlist(&self) -> Result<Watchlist, SourceError> {
        let file = match File::open(&self.watchlist_path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Watchlist::new()),
            Err(source) => {
                return Err(SourceError::Unavailable {
                    path: self.watchlist_path.clone(),
                    source,
                })
            }
        };

        parse_watchlist(file).map_err(|source| SourceError::Malformed {
            path: self.watchlist_path.clone(),
            source,
        })
    }
}

pub fn parse_applications<R: Read>(reader: R) -> Result<Vec<ApplicationSubmission>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<ApplicationSubmission>()
        .collect()
}

#[derive(Debug, Deserialize)]
struct WatchlistRow {
    nic: String,
}

pub fn parse_watchlist<R: Read>(reader: R) -> Result<Watchlist, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut watchlist = Watchlist::new();
    for row in csv_reader.deserialize::<WatchlistRow>() {
        let row = row?;
        if !row.nic.is_empty() {
            watchlist.insert(Nic(row.nic));
        }
    }

    Ok(watchlist)
}
