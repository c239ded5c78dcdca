//! Tab-separated peak tables.
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path;

use crate::peak::DetectedPeak;
use crate::table::PeakTable;

pub const PEAK_TABLE_HEADER: &str = "index\tppm\tvalue\tsnr\tscale\tsample";

/// Write `table` as tab-separated text with a header row
pub fn write_peak_table<W: Write, S: Display>(table: &PeakTable<S>, mut writer: W) -> io::Result<()> {
    writeln!(writer, "{PEAK_TABLE_HEADER}")?;
    for peak in table.iter() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            peak.index, peak.ppm, peak.value, peak.signal_to_noise, peak.scale, peak.sample
        )?;
    }
    writer.flush()
}

pub fn to_file<P: AsRef<path::Path>, S: Display>(table: &PeakTable<S>, path: P) -> io::Result<()> {
    let file = fs::File::create(path)?;
    write_peak_table(table, io::BufWriter::new(file))
}

fn invalid_data(line_number: usize, message: String) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("line {line_number}: {message}"),
    )
}

fn parse_field<T: std::str::FromStr>(
    field: Option<&str>,
    name: &str,
    line_number: usize,
) -> io::Result<T> {
    let field = field.ok_or_else(|| invalid_data(line_number, format!("missing {name}")))?;
    field
        .trim()
        .parse()
        .map_err(|_| invalid_data(line_number, format!("could not parse {name} from {field:?}")))
}

/// Read a table written by [`write_peak_table`] back
pub fn read_peak_table<R: BufRead, S: std::str::FromStr>(reader: R) -> io::Result<PeakTable<S>> {
    let mut peaks = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if i == 0 && line.starts_with("index") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let line_number = i + 1;
        peaks.push(DetectedPeak::new(
            parse_field(fields.next(), "index", line_number)?,
            parse_field(fields.next(), "ppm", line_number)?,
            parse_field(fields.next(), "value", line_number)?,
            parse_field(fields.next(), "snr", line_number)?,
            parse_field(fields.next(), "scale", line_number)?,
            parse_field(fields.next(), "sample", line_number)?,
        ));
    }
    Ok(PeakTable::new(peaks))
}

pub fn load_peak_table<P: AsRef<path::Path>, S: std::str::FromStr>(path: P) -> io::Result<PeakTable<S>> {
    let file = fs::File::open(path)?;
    read_peak_table(io::BufReader::new(file))
}
