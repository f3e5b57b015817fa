use crate::error::{Error, Result};

/// Separator between fields of a row-store line
pub const ROW_DELIMITER: &str = " ### ";

/// A row is an ordered list of fields, positionally aligned to the header
pub type Row = Vec<String>;

/// Joins fields into one row-store line
pub fn encode_row(row: &[String]) -> String {
    row.join(ROW_DELIMITER)
}

/// Splits a row-store line into trimmed fields
///
/// Tolerates uneven whitespace around the delimiter, as older write paths
/// produced it.
pub fn decode_row(line: &str) -> Row {
    line.split("###").map(|field| field.trim().to_string()).collect()
}

/// Rejects values that cannot be stored without breaking the line format
pub fn check_field(value: &str) -> Result<()> {
    if value.contains("###") {
        return Err(Error::Parse(format!(
            "value {} contains the reserved delimiter ###",
            value
        )));
    }
    if value.contains(['\n', '\r']) {
        return Err(Error::Parse(format!("value {:?} contains a line break", value)));
    }
    Ok(())
}

/// Rejects a row whose line would be blank; blank lines are not rows
pub fn check_row(row: &[String]) -> Result<()> {
    if encode_row(row).trim().is_empty() {
        return Err(Error::Parse("a row must have at least one non-empty field".to_string()));
    }
    Ok(())
}

/// Case-insensitive position of `name` in a header row
pub fn column_position(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|c| c.trim().eq_ignore_ascii_case(name.trim()))
}
