// Primitives for reading CSV exports.

use cultures_map::builder::Builder;

use crate::dash::{io_common::strip_bom, *};

/// Reads a delimited table with a header row.
///
/// Lines that cannot be decoded, or that have more cells than the header, are skipped.
pub fn read_csv_table(content: &[u8], delimiter: u8, digest: String) -> BDashResult<RecordTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(strip_bom(content));

    let header: Vec<String> = rdr
        .headers()
        .context(CsvHeaderSnafu {})?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_csv_table: header: {:?}", header);

    let mut builder = Builder::new(&header).context(PipelineSnafu {})?;

    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        match line_r {
            Ok(line) if line.len() <= header.len() => {
                let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
                builder.add_row(&cells);
            }
            Ok(line) => {
                warn!(
                    "read_csv_table: line {}: {} cells for {} columns, skipping",
                    lineno,
                    line.len(),
                    header.len()
                );
                builder.add_malformed();
            }
            Err(e) => {
                warn!("read_csv_table: line {}: skipping: {}", lineno, e);
                builder.add_malformed();
            }
        }
    }

    let table = builder.build(digest);
    info!(
        "read_csv_table: {} records, {} dropped, {} malformed lines",
        table.records.len(),
        table.dropped_rows,
        table.malformed_lines
    );
    Ok(table)
}
