// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use crate::row::{Row, cell, column_index};

/// Number of leading cells joined into a composite signature.
pub const COMPOSITE_WIDTH: usize = 3;
const COMPOSITE_SEPARATOR: &str = "|";

/// How a row's identity is derived when selection has to survive a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionKey {
    /// Value of the named column. Falls back to `Composite` when the header
    /// has no such column.
    Column(String),
    #[default]
    Composite,
}

impl SelectionKey {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn from_config(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => Self::Column(name.to_owned()),
            _ => Self::Composite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn signature(header: &[String], key: &SelectionKey, row: &[String]) -> Signature {
    if let SelectionKey::Column(name) = key
        && let Some(index) = column_index(header, name)
    {
        return Signature(cell(row, index).to_owned());
    }

    let column_count = if header.is_empty() {
        row.len()
    } else {
        header.len()
    };
    let parts = (0..column_count.min(COMPOSITE_WIDTH))
        .map(|index| cell(row, index))
        .collect::<Vec<_>>();
    Signature(parts.join(COMPOSITE_SEPARATOR))
}

/// Linear scan for the first row carrying `target`. Duplicate signatures
/// resolve to the earliest row.
pub fn find_signature(
    header: &[String],
    key: &SelectionKey,
    rows: &[Row],
    target: &Signature,
) -> Option<usize> {
    rows.iter()
        .position(|row| signature(header, key, row) == *target)
}

#[cfg(test)]
mod tests {
    use super::{SelectionKey, find_signature, signature};
    use crate::row::row;

    #[test]
    fn key_column_value_is_the_signature() {
        let header = row(["id", "name"]);
        let key = SelectionKey::column("id");
        assert_eq!(signature(&header, &key, &row(["7", "seven"])).as_str(), "7");
    }

    #[test]
    fn unknown_key_column_falls_back_to_composite() {
        let header = row(["id", "name"]);
        let key = SelectionKey::column("uuid");
        assert_eq!(
            signature(&header, &key, &row(["7", "seven"])).as_str(),
            "7|seven"
        );
    }

    #[test]
    fn composite_uses_at_most_three_cells() {
        let header = row(["a", "b", "c", "d"]);
        let sig = signature(
            &header,
            &SelectionKey::Composite,
            &row(["1", "2", "3", "4"]),
        );
        assert_eq!(sig.as_str(), "1|2|3");
    }

    #[test]
    fn composite_pads_short_rows() {
        let header = row(["a", "b", "c"]);
        let sig = signature(&header, &SelectionKey::Composite, &row(["1"]));
        assert_eq!(sig.as_str(), "1||");
    }

    #[test]
    fn headerless_rows_use_their_own_width() {
        let sig = signature(&[], &SelectionKey::Composite, &row(["x", "y"]));
        assert_eq!(sig.as_str(), "x|y");
    }

    #[test]
    fn duplicate_signatures_resolve_to_first_match() {
        let header = row(["id", "name"]);
        let key = SelectionKey::column("name");
        let rows = vec![row(["1", "dup"]), row(["2", "dup"])];
        let target = signature(&header, &key, &rows[1]);
        assert_eq!(find_signature(&header, &key, &rows, &target), Some(0));
    }

    #[test]
    fn from_config_treats_blank_as_composite() {
        assert_eq!(SelectionKey::from_config(None), SelectionKey::Composite);
        assert_eq!(SelectionKey::from_config(Some("  ")), SelectionKey::Composite);
        assert_eq!(
            SelectionKey::from_config(Some("ID")),
            SelectionKey::column("ID")
        );
    }
}
