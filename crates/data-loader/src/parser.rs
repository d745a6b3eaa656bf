//! Parser for the two CSV input files.
//!
//! - movies.csv:  movieId,title,genres
//! - ratings.csv: userId,movieId,rating,timestamp
//!
//! Both files start with a header row. Titles may be quoted and contain
//! commas (`"American President, The (1995)"`), so rows go through the
//! `csv` reader rather than a plain split.
//!
//! Rows with the wrong field count or an unparsable number are never
//! coerced to zero: depending on the `MalformedRowPolicy` they either fail
//! the load or are skipped with a warning.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

const MOVIE_FIELDS: usize = 3;
const RATING_FIELDS: usize = 4;

/// Open a file, mapping "not found" to a friendlier error
fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse the movies file
pub fn parse_movies(path: &Path, policy: MalformedRowPolicy) -> Result<Vec<Movie>> {
    let file = open(path)?;
    parse_movies_from_reader(file, &file_label(path), policy)
}

/// Parse the ratings file
pub fn parse_ratings(path: &Path, policy: MalformedRowPolicy) -> Result<Vec<Rating>> {
    let file = open(path)?;
    parse_ratings_from_reader(file, &file_label(path), policy)
}

/// Parse movie rows from any reader. `file` only labels error messages.
pub fn parse_movies_from_reader<R: Read>(
    reader: R,
    file: &str,
    policy: MalformedRowPolicy,
) -> Result<Vec<Movie>> {
    read_rows(reader, file, MOVIE_FIELDS, policy, |record, line| {
        Ok(Movie {
            id: parse_field(record, 0, "movieId", file, line)?,
            title: record[1].to_string(),
            genres: parse_genres(&record[2]),
        })
    })
}

/// Parse rating rows from any reader. `file` only labels error messages.
pub fn parse_ratings_from_reader<R: Read>(
    reader: R,
    file: &str,
    policy: MalformedRowPolicy,
) -> Result<Vec<Rating>> {
    read_rows(reader, file, RATING_FIELDS, policy, |record, line| {
        Ok(Rating {
            user_id: parse_field(record, 0, "userId", file, line)?,
            movie_id: parse_field(record, 1, "movieId", file, line)?,
            rating: parse_field(record, 2, "rating", file, line)?,
            timestamp: parse_field(record, 3, "timestamp", file, line)?,
        })
    })
}

/// Shared row loop: header skip, field-count check, policy handling
fn read_rows<R, T, F>(
    reader: R,
    file: &str,
    expected: usize,
    policy: MalformedRowPolicy,
    parse_row: F,
) -> Result<Vec<T>>
where
    R: Read,
    F: Fn(&StringRecord, u64) -> Result<T>,
{
    // `flexible` hands us short/long rows so we can report them ourselves
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let parsed = if record.len() != expected {
            Err(DataLoadError::MalformedRow {
                file: file.to_string(),
                line,
                expected,
                found: record.len(),
            })
        } else {
            parse_row(&record, line)
        };

        match parsed {
            Ok(row) => rows.push(row),
            Err(e) if policy == MalformedRowPolicy::Skip && e.is_row_error() => {
                warn!("Skipping row: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows in {}", skipped, file);
    }
    Ok(rows)
}

fn parse_field<T>(record: &StringRecord, idx: usize, name: &str, file: &str, line: u64) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = &record[idx];
    raw.parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Invalid {} {:?}: {}", name, raw, e),
    })
}

/// Split a pipe-separated genre list
///
/// Example: "Action|Adventure|Sci-Fi" -> ["Action", "Adventure", "Sci-Fi"]
fn parse_genres(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "(no genres listed)")
        .map(String::from)
        .collect()
}
