//! Label file output in the dymo CSV layout.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::OutputError;
use crate::label::LabelRecord;

/// Column header of every label file
pub const CSV_HEADER: [&str; 7] = [
    "name",
    "latitude",
    "longitude",
    "font size",
    "font file",
    "point size",
    "preferred placement",
];

/// Decimal places kept for coordinates
const COORDINATE_DECIMALS: i32 = 5;

/// File name of the label file for a zoom level
pub fn label_file_name(zoom: u8) -> String {
    format!("city_labels_z{}.csv", zoom)
}

pub fn label_file_path(output_dir: &Path, zoom: u8) -> PathBuf {
    output_dir.join(label_file_name(zoom))
}

#[inline]
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    // Adding zero folds -0.0 into 0.0
    (value * scale).round() / scale + 0.0
}

/// Destination for emitted label records
pub trait LabelSink {
    fn write_label(&mut self, record: &LabelRecord) -> Result<(), OutputError>;

    /// Flush buffered rows
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

impl LabelSink for Vec<LabelRecord> {
    fn write_label(&mut self, record: &LabelRecord) -> Result<(), OutputError> {
        self.push(record.clone());
        Ok(())
    }
}

/// CSV writer producing the seven-column label layout
pub struct CsvLabelWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvLabelWriter<W> {
    /// Wrap a writer and emit the header row
    pub fn new(inner: W) -> Result<Self, OutputError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, OutputError> {
        self.writer
            .into_inner()
            .map_err(|err| OutputError::Io(err.into_error()))
    }
}

impl CsvLabelWriter<File> {
    /// Create (or truncate) a label file. The csv writer does its own buffering.
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        let file = File::create(path).map_err(|source| OutputError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl<W: Write> LabelSink for CsvLabelWriter<W> {
    fn write_label(&mut self, record: &LabelRecord) -> Result<(), OutputError> {
        self.writer.write_record([
            record.name.clone(),
            round_coordinate(record.latitude).to_string(),
            round_coordinate(record.longitude).to_string(),
            record.font_size.to_string(),
            record.font_file.clone(),
            record.point_size.to_string(),
            record.preferred_placement.clone(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, lat: f64, lon: f64) -> LabelRecord {
        LabelRecord {
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
            font_size: 20,
            font_file: "./fonts/Arial-Unicode-Bold.ttf".to_string(),
            point_size: 0,
            preferred_placement: String::new(),
        }
    }

    fn render(records: &[LabelRecord]) -> String {
        let mut writer = CsvLabelWriter::new(Vec::new()).unwrap();
        for r in records {
            writer.write_label(r).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_rounding() {
        let out = render(&[record("東京", 35.689_487_3, 139.691_706_4)]);
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,latitude,longitude,font size,font file,point size,preferred placement"
        );
        assert_eq!(
            lines.next().unwrap(),
            "東京,35.68949,139.69171,20,./fonts/Arial-Unicode-Bold.ttf,0,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_names_with_delimiters_are_quoted() {
        let out = render(&[record("Washington, D.C.", 38.9, -77.0)]);
        assert!(out.lines().nth(1).unwrap().starts_with("\"Washington, D.C.\",38.9,-77,"));
    }

    #[test]
    fn test_label_file_naming() {
        assert_eq!(label_file_name(9), "city_labels_z9.csv");
        assert_eq!(
            label_file_path(Path::new("/tmp/out"), 12),
            PathBuf::from("/tmp/out/city_labels_z12.csv")
        );
    }

    #[test]
    fn test_round_coordinate() {
        assert_eq!(round_coordinate(1.234_564_9), 1.23456);
        assert_eq!(round_coordinate(-0.000_004).to_string(), "0");
        assert_eq!(round_coordinate(51.5), 51.5);
    }

    #[test]
    fn test_create_writes_file_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(label_file_name(5));

        let mut writer = CsvLabelWriter::create(&path).unwrap();
        writer.write_label(&record("Kyoto", 35.0116, 135.7681)).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Kyoto,35.0116,135.7681,20,./fonts/Arial-Unicode-Bold.ttf,0,");
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let err = CsvLabelWriter::create(Path::new("/nonexistent-dir/labels.csv")).err().unwrap();
        assert!(matches!(err, OutputError::Create { .. }));
    }
}
