use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A rectangular table that can be exported as CSV.
pub trait Tabular {
    /// Column names, in output order.
    fn header(&self) -> Vec<String>;

    /// Records, each with as many fields as the header.
    fn records(&self) -> Vec<Vec<String>>;
}

/// Writes a header line followed by every record.
pub fn write_csv<T: Tabular + ?Sized>(table: &T, writer: impl Write) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.header())?;
    for record in table.records() {
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_to_path<T: Tabular + ?Sized, P: AsRef<Path>>(
    table: &T,
    path: P,
) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    write_csv(table, std::io::BufWriter::new(file))
}
