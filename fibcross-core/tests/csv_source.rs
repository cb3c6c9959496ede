//! Integration tests for the CSV bar source.
//!
//! Tests:
//! 1. Well-formed file loads in order with optional volume absent
//! 2. Non-numeric close drops the row; other gaps are forward-filled
//! 3. Unsorted and duplicated rows are canonicalized by the historical feed
//! 4. Missing files and unparseable dates are errors
//! 5. A junk row without a close is dropped before its date is read

use fibcross_core::data::{BarFeed, BarSource, CsvSource, DataError, HistoricalFeed};
use fibcross_core::indicators::{IndicatorParams, IndicatorPipeline};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_well_formed_file_without_volume() {
    let file = write_csv(
        "date,open,high,low,close\n\
         2021-01-04T14:30:00Z,10,11,9,10.5\n\
         2021-01-04T14:31:00Z,10.5,12,10,11.5\n\
         2021-01-04T14:32:00Z,11.5,12,11,11.75\n",
    );
    let mut source = CsvSource::new(file.path());
    let bars = source.load().unwrap();
    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].timestamp.to_string(), "2021-01-04 14:30:00");
    assert_eq!(bars[1].high, 12.0);
    assert_eq!(bars[2].close, 11.75);
    assert!(bars.iter().all(|b| b.volume == 0.0));
}

#[test]
fn non_numeric_close_drops_row_and_fills_gaps() {
    let file = write_csv(
        "date,open,high,low,close,volume\n\
         2021-01-04,10,11,9,10.5,100\n\
         2021-01-05,n/a,12,10,x,200\n\
         2021-01-06,,13,11,12,\n",
    );
    let bars = CsvSource::new(file.path()).load().unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[1].close, 12.0);
    // open and volume come from the last kept row, not the dropped one
    assert_eq!(bars[1].open, 10.0);
    assert_eq!(bars[1].volume, 100.0);
    assert_eq!(bars[1].high, 13.0);
}

#[test]
fn feed_canonicalizes_unsorted_input() {
    let file = write_csv(
        "date,open,high,low,close\n\
         2021-01-06,3,3,3,3\n\
         2021-01-04,1,1,1,1\n\
         2021-01-05,2,2,2,2\n\
         2021-01-05,9,9,9,9\n",
    );
    let pipeline = IndicatorPipeline::new(IndicatorParams::default()).unwrap();
    let mut source = CsvSource::new(file.path());
    let mut feed = HistoricalFeed::load("CSV", &mut source, &pipeline).unwrap();
    assert_eq!(feed.len(), 3);
    let closes: Vec<f64> = std::iter::from_fn(|| feed.advance().map(|b| b.close)).collect();
    assert_eq!(closes, vec![1.0, 2.0, 3.0]);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = CsvSource::new(dir.path().join("nope.csv"));
    assert!(matches!(source.load(), Err(DataError::Io(_))));
}

#[test]
fn unparseable_date_is_an_error() {
    let file = write_csv("date,open,high,low,close\nsoon,1,1,1,1\n");
    let err = CsvSource::new(file.path()).load().unwrap_err();
    assert!(matches!(err, DataError::Csv { .. }), "got {err:?}");
}

#[test]
fn trailing_junk_row_is_dropped_not_parsed() {
    let file = write_csv(
        "date,open,high,low,close\n\
         2021-01-04,1,1,1,1\n\
         2021-01-05,2,2,2,2\n\
         footer,,,,\n",
    );
    let bars = CsvSource::new(file.path()).load().unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[1].close, 2.0);
}
