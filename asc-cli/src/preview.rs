//! Head-of-table previews for the terminal.

use crate::output::{CsvRecord, CsvWriter, OutputError};
use asc_core::{DecodeResult, RecordKind};
use std::io::Write;

fn preview_table<W: Write, R: CsvRecord>(
    out: &mut W,
    kind: RecordKind,
    records: &[R],
    rows: usize,
) -> Result<(), OutputError> {
    let shown = rows.min(records.len());
    writeln!(out, "{} ({} of {}):", kind.table_name(), shown, records.len())?;

    let mut writer = CsvWriter::new(&mut *out);
    writer.write_header::<R>()?;
    writer.write_records(&records[..shown])?;
    writer.flush()?;
    drop(writer);

    writeln!(out)?;
    Ok(())
}

/// Prints the first `rows` records of every table as CSV.
pub fn print_preview<W: Write>(
    out: &mut W,
    result: &DecodeResult,
    rows: usize,
) -> Result<(), OutputError> {
    preview_table(out, RecordKind::Sample, &result.samples, rows)?;
    preview_table(out, RecordKind::Fixation, &result.fixations, rows)?;
    preview_table(out, RecordKind::Saccade, &result.saccades, rows)?;
    preview_table(out, RecordKind::Blink, &result.blinks, rows)?;
    preview_table(out, RecordKind::Message, &result.messages, rows)?;
    Ok(())
}
