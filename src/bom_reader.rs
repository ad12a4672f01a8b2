//! BOM spreadsheet reader
//!
//! Reads the BOM report of Altium Designer, either the Excel workbook or the
//! same sheet saved as CSV. The first record holds project metadata as
//! `Key:,value` cell pairs, the second one names the columns and every
//! following record is one BOM row.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, warn};

use crate::bom::{Bom, BomData, BomField, BomRow, FieldValue};
use crate::error::{Diagnostic, Error};

const DATA_HEADER_SUFFIX: &str = ":";

/// A BOM read from a spreadsheet with the cells that could not be used
#[derive(Clone, Debug, Default)]
pub struct BomImport {
    pub bom: Bom,
    pub diagnostics: Vec<Diagnostic>,
}

/// One sheet row with its 1-based line, if known
struct Record {
    line: Option<usize>,
    cells: Vec<String>,
}

impl Record {
    fn get(&self, i: usize) -> Option<&str> {
        self.cells.get(i).map(String::as_str)
    }
}

pub struct AltiumBomReader;

impl AltiumBomReader {
    /// Read the first worksheet of an Excel BOM (`.xlsx`, `.xls`, `.ods`)
    pub fn from_excel(path: impl AsRef<Path>) -> Result<BomImport, Error> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::EmptyWorkbook(path.to_owned()))??;
        debug!(path = %path.display(), "reading BOM workbook");
        read_records(sheet_records(&range).map(Ok))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<BomImport, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Read a BOM saved as CSV
    pub fn from_reader<R: Read>(reader: R) -> Result<BomImport, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let records = reader.records().map(|record| -> Result<Record, Error> {
            let record = record?;
            Ok(Record {
                line: record.position().map(|p| p.line() as usize),
                cells: record.iter().map(str::to_owned).collect(),
            })
        });
        read_records(records)
    }
}

fn sheet_records(range: &Range<Data>) -> impl Iterator<Item = Record> + '_ {
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let first_col = range.start().map_or(0, |(_, col)| col as usize);
    range.rows().enumerate().map(move |(i, row)| {
        // Keep column positions when the sheet does not start at column A
        let cells = std::iter::repeat(String::new())
            .take(first_col)
            .chain(row.iter().map(cell_text))
            .collect();
        Record {
            line: Some(first_row + i + 1),
            cells,
        }
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        other => other.to_string(),
    }
}

fn read_records<I>(mut records: I) -> Result<BomImport, Error>
where
    I: Iterator<Item = Result<Record, Error>>,
{
    let mut import = BomImport::default();

    let Some(metadata) = records.next().transpose()? else {
        return Ok(import);
    };
    import.bom.data = read_metadata(&metadata);

    let Some(header) = records.next().transpose()? else {
        return Ok(import);
    };
    let columns: Vec<(usize, BomField)> = header
        .cells
        .iter()
        .enumerate()
        .filter_map(|(i, name)| BomField::from_name(name.trim()).map(|field| (i, field)))
        .collect();
    let designator_column = columns
        .iter()
        .find(|(_, field)| *field == BomField::Designator)
        .map(|(i, _)| *i);

    for record in records {
        let record = record?;
        if record.cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let designator = designator_column
            .and_then(|i| record.get(i))
            .unwrap_or_default();

        let mut row = BomRow::new();
        let mut errors = vec![];
        for &(i, field) in &columns {
            let Some(cell) = record.get(i).filter(|cell| !cell.is_empty()) else {
                continue;
            };
            if let Err(error) = row.set(field, FieldValue::parse_as(field.kind(), cell)) {
                errors.push(error);
            }
        }
        for diagnostic in Diagnostic::dropped_fields(record.line, designator, errors) {
            warn!(%diagnostic, "dropped BOM cell");
            import.diagnostics.push(diagnostic);
        }
        import.bom.rows.append(row);
    }

    debug!(
        rows = import.bom.rows.len(),
        columns = columns.len(),
        "read BOM spreadsheet"
    );
    Ok(import)
}

fn read_metadata(record: &Record) -> BomData {
    let mut data = BomData::new();
    for name in BomData::FIELD_NAMES {
        let key = format!("{name}{DATA_HEADER_SUFFIX}");
        let value = record
            .cells
            .iter()
            .position(|cell| cell.trim() == key)
            .and_then(|i| record.get(i + 1))
            .filter(|value| !value.is_empty());
        if let (Some(value), Some((_, slot))) = (value, data.slot(name)) {
            *slot = value.to_owned();
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::FieldKind;
    use crate::error::{DiagnosticKind, FieldError};
    use rstest::*;

    macro_rules! test_path {
        ($fname:expr) => {
            concat!(env!("CARGO_MANIFEST_DIR"), "/resources/test/", $fname)
        };
    }

    #[test]
    fn altium_fixture() {
        let import = AltiumBomReader::from_path(test_path!("altium_led_resistor.csv")).unwrap();
        let bom = &import.bom;

        assert_eq!(bom.data.project, "LED-Resistor");
        assert_eq!(bom.data.equipment, "Demo Board");
        assert_eq!(bom.data.batch_number, "B01");
        assert_eq!(bom.data.variant, "");
        assert_eq!(bom.data.git_hash, "1a2b3c4");
        assert_eq!(bom.data.gerber_version, "GA");

        assert_eq!(bom.rows.len(), 3);
        let first = bom.rows.get(0).unwrap();
        assert_eq!(first.part_number, "OL_G_0603_150060VS55040");
        assert_eq!(first.quantity, 1);
        assert_eq!(first.designator, "D1");
        let second = bom.rows.get(1).unwrap();
        assert_eq!(second.comment, "");
        let last = bom.rows.get(2).unwrap();
        assert_eq!(last.part_number, "R_1k_0402_1");
        assert_eq!(last.quantity, 0);
        assert_eq!(last.index, Some(2));

        assert_eq!(
            import.diagnostics,
            [Diagnostic::new(
                Some(5),
                DiagnosticKind::DroppedField {
                    designator: "R1".to_owned(),
                    error: FieldError::TypeMismatch {
                        field: "Quantity",
                        expected: FieldKind::Integer,
                        found: FieldKind::Text,
                    },
                }
            )]
        );
    }

    #[test]
    fn altium_workbook() {
        let import = AltiumBomReader::from_excel(test_path!("altium_led_resistor.xlsx")).unwrap();
        let bom = &import.bom;

        assert_eq!(bom.data.project, "LED-Resistor");
        assert_eq!(bom.data.git_hash, "1a2b3c4");
        assert_eq!(bom.data.variant, "");

        assert_eq!(bom.rows.len(), 3);
        let first = bom.rows.get(0).unwrap();
        assert_eq!(first.part_number, "OL_G_0603_150060VS55040");
        assert_eq!(first.quantity, 1);
        assert_eq!(bom.rows.get(1).unwrap().designator, "J1");
        assert_eq!(bom.rows.get(2).unwrap().part_number, "R_1k_0402_1");

        let lines: Vec<_> = import.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, [Some(5)]);
    }

    #[test]
    fn workbook_and_csv_agree() {
        let workbook = AltiumBomReader::from_excel(test_path!("altium_led_resistor.xlsx")).unwrap();
        let csv = AltiumBomReader::from_path(test_path!("altium_led_resistor.csv")).unwrap();
        assert_eq!(workbook.bom, csv.bom);
        assert_eq!(workbook.diagnostics, csv.diagnostics);
    }

    #[test]
    fn missing_workbook() {
        let result = AltiumBomReader::from_excel(test_path!("does_not_exist.xlsx"));
        assert!(matches!(result, Err(Error::Excel(_))));
    }

    #[rstest]
    #[case(Data::Empty, "")]
    #[case(Data::String("R1".to_owned()), "R1")]
    #[case(Data::Float(3.0), "3")]
    #[case(Data::Float(2.5), "2.5")]
    #[case(Data::Bool(false), "false")]
    fn workbook_cells(#[case] cell: Data, #[case] expected: &str) {
        assert_eq!(cell_text(&cell), expected);
    }

    #[test]
    fn metadata_ignores_unknown_keys() {
        let input = "Author:,Me,Project:,P,GitHash:\nDesignator\n";
        let import = AltiumBomReader::from_reader(input.as_bytes()).unwrap();
        assert_eq!(import.bom.data.project, "P");
        assert_eq!(import.bom.data.git_hash, "");
        assert!(import.diagnostics.is_empty());
    }

    #[test]
    fn blank_rows_are_skipped() {
        let input = "Project:,P\nDesignator,Value\n,\nR1,1k\n";
        let import = AltiumBomReader::from_reader(input.as_bytes()).unwrap();
        assert_eq!(import.bom.rows.len(), 1);
        assert_eq!(import.bom.rows.get(0).unwrap().index, Some(0));
    }

    #[test]
    fn flag_column() {
        let input = "Project:,P\nDesignator,isTypeBom\nR1,FALSE\nR2,yes\n";
        let import = AltiumBomReader::from_reader(input.as_bytes()).unwrap();
        assert!(!import.bom.rows.get(0).unwrap().is_type_bom);
        assert!(import.bom.rows.get(1).unwrap().is_type_bom);
        assert_eq!(import.diagnostics.len(), 1);
    }

    #[test]
    fn metadata_only() {
        let import = AltiumBomReader::from_reader("Project:,P\n".as_bytes()).unwrap();
        assert_eq!(import.bom.data.project, "P");
        assert!(import.bom.rows.is_empty());
    }

    #[test]
    fn empty_input() {
        let import = AltiumBomReader::from_reader("".as_bytes()).unwrap();
        assert_eq!(import.bom, Bom::default());
    }

    #[test]
    fn missing_file() {
        let result = AltiumBomReader::from_path(test_path!("does_not_exist.csv"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
