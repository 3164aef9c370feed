/*!
 * Vendor date-token extraction
 *
 * Several vendors encode their batch date in the file or directory name
 * rather than in anything the filesystem records. Each extractor scans for
 * its token, takes the last match when there are several, and resolves it
 * to midnight UTC of that day (or the exact time, when the token has one).
 */

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors that can occur while extracting a date token
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("no date token in '{subject}'")]
    NoToken { subject: String },

    #[error("date token '{token}' does not parse as {format}")]
    Unparseable { token: String, format: &'static str },

    #[error("path has no usable {part}")]
    MissingPart { part: &'static str },
}

// `1|2`, then `0|1`, then four digits, optionally two more.
static CMAG_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[12][01]\d{4}(?:\d{2})?").unwrap());

static LOTAME_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[12][01]\d{8}").unwrap());

static SILVERPOP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Raw Recipient Data Export ([^/.]*)\s\d+.*$").unwrap());

const SILVERPOP_FORMATS: [&str; 2] = ["%b %d %Y %I-%M-%S %p", "%b %d %Y %H-%M-%S %p"];

/// Date encoded in a cmag file name.
///
/// An eight-character token reads as `%Y%m%d`, a six-character one as
/// `%y%m%d`.
pub fn cmag_date(file_name: &str) -> Result<DateTime<Utc>, TimestampError> {
    let token = CMAG_TOKEN
        .find_iter(file_name)
        .last()
        .map(|m| m.as_str())
        .ok_or_else(|| TimestampError::NoToken {
            subject: file_name.to_string(),
        })?;

    let format = if token.len() == 8 { "%Y%m%d" } else { "%y%m%d" };
    parse_day(token, format)
}

/// Date encoded in the name of the directory containing a lotame file.
///
/// The token is ten characters long; only its first eight (`%Y%m%d`) are
/// used.
pub fn lotame_date(file: &Path) -> Result<DateTime<Utc>, TimestampError> {
    let parent = file
        .parent()
        .and_then(Path::to_str)
        .ok_or(TimestampError::MissingPart { part: "parent directory" })?;

    let token = LOTAME_TOKEN
        .find_iter(parent)
        .last()
        .map(|m| &m.as_str()[..8])
        .ok_or_else(|| TimestampError::NoToken {
            subject: parent.to_string(),
        })?;

    parse_day(token, "%Y%m%d")
}

/// Date encoded in a silverpop "Raw Recipient Data Export" file name, e.g.
/// `Raw Recipient Data Export Mar 05 2021 10-15-00 AM 123.csv`.
pub fn silverpop_date(file_name: &str) -> Result<DateTime<Utc>, TimestampError> {
    let phrase = SILVERPOP_NAME
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| TimestampError::NoToken {
            subject: file_name.to_string(),
        })?;

    SILVERPOP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(phrase, format).ok())
        .map(|time| time.and_utc())
        .ok_or_else(|| TimestampError::Unparseable {
            token: phrase.to_string(),
            format: SILVERPOP_FORMATS[0],
        })
}

fn parse_day(token: &str, format: &'static str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDate::parse_from_str(token, format)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| TimestampError::Unparseable {
            token: token.to_string(),
            format,
        })
}
