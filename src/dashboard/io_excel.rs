// Primitives for reading Excel (.xlsx) exports, as downloaded from Google Forms or Microsoft Forms.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::dashboard::{io_common::RawSheet, *};

pub fn read_excel_sheet(path: &str, worksheet_name: Option<&str>) -> BDashResult<RawSheet> {
    let wrange = get_range(path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header_cells = iter.next().context(EmptyExcelSnafu {})?;
    let header: Vec<String> = header_cells
        .iter()
        .map(|c| read_cell(1, c))
        .collect::<BDashResult<Vec<String>>>()?;
    debug!("read_excel_sheet: header: {:?}", header);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = (idx + 2) as u64;
        debug!("read_excel_sheet: lineno: {:?} row: {:?}", lineno, &row);
        let cells = row
            .iter()
            .map(|c| read_cell(lineno, c))
            .collect::<BDashResult<Vec<String>>>()?;
        rows.push(cells);
    }
    Ok(RawSheet { header, rows })
}

/// Renders a cell the way it would appear in a CSV export.
pub fn read_cell(lineno: u64, cell: &DataType) -> BDashResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        // Scores are stored as floats by most spreadsheet tools: 4.0 is written 4.
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => Err(Box::new(DashError::ExcelWrongCellType {
            lineno,
            content: format!("{:?}", cell),
        })),
    }
}

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BDashResult<calamine::Range<DataType>> {
    debug!(
        "read_excel_sheet: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(DashError::EmptyExcel {})),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_sheet: path: {:?} worksheet: {:?}",
                    path, worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => Err(Box::new(DashError::AmbiguousWorksheet {
                path: path.to_string(),
                count: all_worksheets.len(),
            })),
        }
    }
}
