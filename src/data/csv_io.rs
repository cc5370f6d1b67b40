//! CSV reading and writing for frames

use super::{Cell, DataError, Frame, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Read a headered CSV file into a frame
pub fn read_frame(path: impl AsRef<Path>) -> Result<Frame> {
    let file = File::open(path.as_ref())?;
    read_frame_from_reader(BufReader::new(file))
}

/// Read headered CSV from any reader into a frame
///
/// Every field comes in as [`Cell::Str`] (blank = missing). Short records
/// pad with missing cells rather than failing the whole file.
pub fn read_frame_from_reader<R: Read>(reader: R) -> Result<Frame> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let names: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    for record in csv_reader.records() {
        let record = record?;
        for (i, column) in columns.iter_mut().enumerate() {
            let cell = record.get(i).map_or(Cell::Missing, Cell::from_field);
            column.push(cell);
        }
    }

    Frame::from_columns(names.into_iter().zip(columns).collect())
}

/// Write a frame to a CSV file, creating parent directories as needed
pub fn write_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_frame_to_writer(frame, BufWriter::new(file))
}

/// Write a frame as headered CSV to any writer
pub fn write_frame_to_writer<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(frame.names())?;
    for row in 0..frame.height() {
        let fields: Vec<String> = frame.row(row).iter().map(Cell::to_field).collect();
        csv_writer.write_record(&fields)?;
    }
    csv_writer.flush().map_err(DataError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_blank_fields_as_missing() {
        let csv = "age,gender\n[60-70),Female\n,Male\n";
        let frame = read_frame_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.cell(0, "age"), Some(&Cell::Str("[60-70)".into())));
        assert_eq!(frame.cell(1, "age"), Some(&Cell::Missing));
    }

    #[test]
    fn read_pads_short_records() {
        let csv = "a,b,c\n1,2\n";
        let frame = read_frame_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(frame.cell(0, "c"), Some(&Cell::Missing));
    }

    #[test]
    fn write_then_read_round_trip() {
        let frame = Frame::from_columns(vec![
            (
                "age_years".to_string(),
                vec![Cell::Num(65.0), Cell::Missing],
            ),
            (
                "gender".to_string(),
                vec![Cell::Str("Female".into()), Cell::Str("Male".into())],
            ),
        ])
        .unwrap();

        let mut buf = Vec::new();
        write_frame_to_writer(&frame, &mut buf).unwrap();
        let read_back = read_frame_from_reader(buf.as_slice()).unwrap();

        assert_eq!(read_back.names(), frame.names());
        assert_eq!(read_back.cell(0, "age_years"), Some(&Cell::Str("65".into())));
        assert_eq!(read_back.cell(1, "age_years"), Some(&Cell::Missing));
    }
}
