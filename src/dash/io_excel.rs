use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use cultures_map::builder::Builder;

use crate::dash::*;

/// Reads the records from an Excel workbook: the first row is the header.
pub fn read_excel_table(
    content: &[u8],
    name: &str,
    worksheet: Option<&str>,
    digest: String,
) -> BDashResult<RecordTable> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(content.to_vec())).context(OpeningExcelSnafu { name })?;
    let wrange = match worksheet {
        Some(ws) => workbook
            .worksheet_range(ws)
            .context(MissingWorksheetSnafu { name, worksheet: ws })?,
        None => workbook.worksheet_range_at(0).context(EmptyExcelSnafu {})?,
    }
    .context(OpeningExcelSnafu { name })?;

    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu {})?
        .iter()
        .map(read_cell)
        .collect();
    debug!("read_excel_table: header: {:?}", header);

    let mut builder = Builder::new(&header).context(PipelineSnafu {})?;
    for row in rows {
        let cells: Vec<String> = row.iter().map(read_cell).collect();
        builder.add_row(&cells);
    }

    let table = builder.build(digest);
    info!(
        "read_excel_table: {}: {} records, {} dropped",
        name,
        table.records.len(),
        table.dropped_rows
    );
    Ok(table)
}

/// Postal codes are often stored as numbers: integral floats lose their decimal part.
fn read_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        _ => {
            debug!("read_cell: ignoring cell {:?}", cell);
            "".to_string()
        }
    }
}
