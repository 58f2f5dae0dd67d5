use crate::{Error, Result};
use chrono::{Datelike, Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Day before the first APOD; requested dates must be strictly after it.
const APOD_EPOCH: (i32, u32, u32) = (1995, 6, 16);

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolves the optional CLI argument into a date, defaulting to `today`.
pub fn resolve_date(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match input {
        Some(input) => parse_apod_date(input, today),
        None => Ok(today),
    }
}

/// Parses a strict `YYYY-MM-DD` date within the APOD archive range.
pub fn parse_apod_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    if !has_date_shape(input) {
        return Err(Error::InvalidInput(format!(
            "Invalid date format: {:?}. Use YYYY-MM-DD",
            input
        )));
    }

    let date = NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("Invalid date {:?}: {}", input, e)))?;

    if (date.year(), date.month(), date.day()) <= APOD_EPOCH || date > today {
        let (y, m, d) = APOD_EPOCH;
        return Err(Error::InvalidInput(format!(
            "Date should be after {:04}-{:02}-{:02} and not after {}",
            y,
            m,
            d,
            today.format(DATE_FORMAT)
        )));
    }

    Ok(date)
}

fn has_date_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
