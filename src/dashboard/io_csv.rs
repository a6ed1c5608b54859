// Primitives for reading CSV files.

use crate::dashboard::{io_common::RawSheet, *};

pub fn read_csv_sheet(path: &str) -> BDashResult<RawSheet> {
    // Rows of the wrong length are reported by the schema check, with their line number.
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();

    let header: Vec<String> = records
        .next()
        .context(EmptyInputSnafu { path })?
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .collect();
    debug!("read_csv_sheet: header: {:?}", header);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_sheet: lineno: {:?} row: {:?}", lineno, line);
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    Ok(RawSheet { header, rows })
}
