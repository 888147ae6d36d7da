use crate::entry::{ScheduleListing, time_of_day};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn save_listings_to_json<P: AsRef<Path>>(
    listings: &[ScheduleListing],
    path: P,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, listings)?;
    Ok(())
}

pub fn load_listings_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<ScheduleListing>, ExportError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[derive(Serialize)]
struct ListingCsvRecord<'a> {
    id: i64,
    day_of_week: u8,
    day_name: &'static str,
    start_time: String,
    end_time: String,
    class_id: i64,
    class_name: &'a str,
    subject: &'a str,
    teacher_name: &'a str,
    classroom_id: i64,
    classroom_name: &'a str,
}

impl<'a> From<&'a ScheduleListing> for ListingCsvRecord<'a> {
    fn from(listing: &'a ScheduleListing) -> Self {
        Self {
            id: listing.id,
            day_of_week: listing.day_of_week.index(),
            day_name: listing.day_of_week.name(),
            start_time: listing.start_time.format(time_of_day::FORMAT).to_string(),
            end_time: listing.end_time.format(time_of_day::FORMAT).to_string(),
            class_id: listing.class_id,
            class_name: &listing.class_name,
            subject: &listing.subject,
            teacher_name: listing.teacher_name.as_deref().unwrap_or(""),
            classroom_id: listing.classroom_id,
            classroom_name: &listing.classroom_name,
        }
    }
}

/// Writes a header row followed by one row per listing, in the order given.
/// An empty slice produces empty output.
pub fn write_listings_csv<W: Write>(listings: &[ScheduleListing], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for listing in listings {
        csv_writer.serialize(ListingCsvRecord::from(listing))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_listings_to_csv<P: AsRef<Path>>(
    listings: &[ScheduleListing],
    path: P,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_listings_csv(listings, file)
}
