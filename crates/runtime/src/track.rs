//! Tracking file output
//!
//! Each tracking module produces one comma-separated text file at the end of
//! a run: a header naming every tracked `module variable` pair, then one row
//! per recorded sample, with the sample time first when time is tracked.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub(crate) fn write_track_file(
    path: &Path,
    headers: &[String],
    time: Option<&[f64]>,
    rows: &[Vec<f64>],
) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    if time.is_some() {
        write!(out, "t, ")?;
    }
    writeln!(out, "{}", headers.join(", "))?;

    for (i, row) in rows.iter().enumerate() {
        if let Some(t_hist) = time {
            if let Some(t) = t_hist.get(i) {
                write!(out, "{t}, ")?;
            }
        }
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", cells.join(", "))?;
    }

    out.flush()
}
