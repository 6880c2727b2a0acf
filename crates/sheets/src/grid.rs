use crate::SheetsError;

/// Spreadsheet column letters for a zero-based index: 0 → `A`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Quoted A1 reference to one cell; `row` is one-based.
pub fn cell_ref(worksheet: &str, column: usize, row: usize) -> String {
    format!("{}!{}{}", quote_sheet(worksheet), column_letter(column), row)
}

pub fn quote_sheet(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

/// Cell writes needed to upsert one keyed record into a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    /// Header row after any new columns were appended.
    pub header: Vec<String>,
    pub header_changed: bool,
    /// One-based row the record lands in.
    pub row: usize,
    /// `(zero-based column, value)` pairs for that row.
    pub cells: Vec<(usize, String)>,
}

/// Work out where `data` goes given the sheet's current contents.
///
/// `rows[0]` is the header. The record's row is the first one whose
/// `key_col` cell equals `key_val`, else the row after the last used one.
/// Unknown columns are appended to the header in `data` order.
pub fn plan_upsert(
    rows: &[Vec<String>],
    key_col: &str,
    key_val: &str,
    data: &[(String, String)],
) -> Result<UpsertPlan, SheetsError> {
    let mut header = rows.first().cloned().unwrap_or_default();
    let key_idx = header
        .iter()
        .position(|h| h == key_col)
        .ok_or_else(|| SheetsError::MissingKeyColumn(key_col.to_string()))?;

    let existing = rows
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, r)| r.get(key_idx).map(String::as_str) == Some(key_val))
        .map(|(i, _)| i + 1);
    let row = existing.unwrap_or(rows.len() + 1);

    let mut cells = Vec::with_capacity(data.len() + 1);
    if existing.is_none() && !data.iter().any(|(k, _)| k == key_col) {
        cells.push((key_idx, key_val.to_string()));
    }

    let mut header_changed = false;
    for (name, value) in data {
        let col = match header.iter().position(|h| h == name) {
            Some(col) => col,
            None => {
                header.push(name.clone());
                header_changed = true;
                header.len() - 1
            }
        };
        cells.push((col, value.clone()));
    }

    Ok(UpsertPlan {
        header,
        header_changed,
        row,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn cell_refs_quote_sheet_names() {
        assert_eq!(cell_ref("Sheet1", 1, 3), "'Sheet1'!B3");
        assert_eq!(cell_ref("Bob's", 0, 1), "'Bob''s'!A1");
    }

    #[test]
    fn existing_key_updates_in_place() {
        let rows = sheet(&[&["id", "total"], &["a", "1"], &["b", "2"]]);
        let plan = plan_upsert(&rows, "id", "b", &pairs(&[("total", "9")])).unwrap();
        assert_eq!(plan.row, 3);
        assert!(!plan.header_changed);
        assert_eq!(plan.cells, vec![(1, "9".to_string())]);
    }

    #[test]
    fn new_key_goes_after_last_row_with_key_cell() {
        let rows = sheet(&[&["id", "total"], &["a", "1"]]);
        let plan = plan_upsert(&rows, "id", "z", &pairs(&[("total", "5")])).unwrap();
        assert_eq!(plan.row, 3);
        assert_eq!(plan.cells, vec![(0, "z".to_string()), (1, "5".to_string())]);
    }

    #[test]
    fn unknown_columns_extend_header() {
        let rows = sheet(&[&["id"], &["a"]]);
        let plan = plan_upsert(&rows, "id", "a", &pairs(&[("vat", "3"), ("total", "4")])).unwrap();
        assert!(plan.header_changed);
        assert_eq!(plan.header, vec!["id", "vat", "total"]);
        assert_eq!(plan.cells, vec![(1, "3".to_string()), (2, "4".to_string())]);
    }

    #[test]
    fn short_rows_do_not_match() {
        let rows = sheet(&[&["name", "id"], &["only-name"]]);
        let plan = plan_upsert(&rows, "id", "only-name", &[]).unwrap();
        assert_eq!(plan.row, 3);
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let rows = sheet(&[&["name"]]);
        assert!(matches!(
            plan_upsert(&rows, "id", "a", &[]),
            Err(SheetsError::MissingKeyColumn(col)) if col == "id"
        ));
        assert!(plan_upsert(&[], "id", "a", &[]).is_err());
    }
}
