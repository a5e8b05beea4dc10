// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// One table row. Cell `i` is interpreted against column `i` of the header;
/// rows may be shorter or longer than the header.
pub type Row = Vec<String>;

/// Ordered column names shared by every row of a table.
pub type Header = Vec<String>;

pub fn row<I, S>(cells: I) -> Row
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    cells.into_iter().map(Into::into).collect()
}

pub fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|column| column == name)
}

pub fn cell<'a>(row: &'a [String], column: usize) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}
