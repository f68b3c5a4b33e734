//! Spreadsheet
//!
//! A workbook of named sheets addressed in A1 notation (`Sheet1!A1:D10`,
//! `Sheet1!A:D`, `Sheet1!C2`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use agent_core::{
    connection::ProviderResponse,
    tool::{Arguments, ParameterSchema, ToolSpec},
};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::error::{Result, WorkspaceError};
use crate::service::{WorkspaceService, optional_str, require_str, require_values};

pub const DEFAULT_SHEET: &str = "Sheet1";
pub const DEFAULT_READ_RANGE: &str = "Sheet1!A:D";

/// Longest column name accepted
const MAX_COLUMN_LETTERS: usize = 3;

/// Worksheet bounds: 1,048,576 rows by 16,384 columns (`XFD`)
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

/// One cell corner of a range; `row` is `None` for whole-column references
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub col: usize,
    pub row: Option<usize>,
}

impl CellRef {
    fn parse(text: &str) -> Option<Self> {
        let split = text.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(text.len());
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || letters.len() > MAX_COLUMN_LETTERS {
            return None;
        }

        let col = letters
            .chars()
            .fold(0, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
            - 1;
        if col >= MAX_COLUMNS {
            return None;
        }

        let row = if digits.is_empty() {
            None
        } else {
            match digits.parse::<usize>() {
                Ok(n) if (1..=MAX_ROWS).contains(&n) => Some(n - 1),
                _ => return None,
            }
        };

        Some(Self { col, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_name(self.col))?;
        if let Some(row) = self.row {
            write!(f, "{}", row + 1)?;
        }
        Ok(())
    }
}

/// Zero-based column index to letters
pub fn column_name(mut col: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(char::from(b'A' + u8::try_from(col % 26).unwrap_or(0)));
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name.iter().rev().collect()
}

/// A parsed A1 range
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: CellRef,
    pub end: CellRef,
}

impl A1Range {
    pub fn is_single_cell(&self) -> bool {
        self.start == self.end && self.start.row.is_some()
    }
}

impl FromStr for A1Range {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WorkspaceError::InvalidRange(s.to_string());
        let text = s.trim();

        let (sheet, cells) = match text.rsplit_once('!') {
            Some((sheet, cells)) => (sheet.trim_matches('\'').to_string(), cells),
            None => (DEFAULT_SHEET.to_string(), text),
        };
        if sheet.is_empty() {
            return Err(invalid());
        }

        let (start, end) = match cells.split_once(':') {
            Some((a, b)) => (CellRef::parse(a).ok_or_else(invalid)?, CellRef::parse(b).ok_or_else(invalid)?),
            None => {
                let cell = CellRef::parse(cells).ok_or_else(invalid)?;
                (cell, cell)
            }
        };

        if start.col > end.col {
            return Err(invalid());
        }
        if let (Some(a), Some(b)) = (start.row, end.row) {
            if a > b {
                return Err(invalid());
            }
        }

        Ok(Self { sheet, start, end })
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}!{}", self.sheet, self.start)
        } else {
            write!(f, "{}!{}:{}", self.sheet, self.start, self.end)
        }
    }
}

type Grid = Vec<Vec<String>>;

/// In-memory workbook
pub struct Spreadsheet {
    sheets: RwLock<BTreeMap<String, Grid>>,
}

impl Spreadsheet {
    pub fn new() -> Self {
        let mut sheets = BTreeMap::new();
        sheets.insert(DEFAULT_SHEET.to_string(), Grid::new());
        Self {
            sheets: RwLock::new(sheets),
        }
    }

    /// Demo applicant tracker
    pub fn seeded() -> Self {
        let rows = [
            ["Name", "Email", "Role", "Status"],
            ["John Doe", "john@example.com", "Software Developer", "Interviewing"],
            ["Jane Smith", "jane@example.com", "Product Manager", "Applied"],
            ["Raj Patel", "raj@example.com", "Data Engineer", "Offer"],
        ];
        let grid: Grid = rows
            .iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect::<Vec<_>>())
            .collect();

        let mut sheets = BTreeMap::new();
        sheets.insert(DEFAULT_SHEET.to_string(), grid);
        Self {
            sheets: RwLock::new(sheets),
        }
    }

    /// Values inside a range, clipped to the populated area
    pub async fn read(&self, range: &A1Range) -> Result<Grid> {
        let sheets = self.sheets.read().await;
        let grid = sheets
            .get(&range.sheet)
            .ok_or_else(|| WorkspaceError::SheetNotFound(range.sheet.clone()))?;

        let first_row = range.start.row.unwrap_or(0);
        let last_row = range.end.row.unwrap_or(usize::MAX);

        Ok(grid
            .iter()
            .enumerate()
            .filter(|(i, _)| (first_row..=last_row).contains(i))
            .map(|(_, row)| {
                row.iter()
                    .skip(range.start.col)
                    .take(range.end.col - range.start.col + 1)
                    .cloned()
                    .collect()
            })
            .collect())
    }

    /// Append a row after the last populated row; returns its 1-based number
    pub async fn append(&self, sheet: &str, values: Vec<String>) -> Result<usize> {
        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| WorkspaceError::SheetNotFound(sheet.to_string()))?;
        if grid.len() >= MAX_ROWS || values.len() > MAX_COLUMNS {
            return Err(WorkspaceError::InvalidRange(format!("{sheet}!A{}", grid.len() + 1)));
        }
        grid.push(values);
        Ok(grid.len())
    }

    /// Write one cell, growing the sheet as needed
    pub async fn update(&self, range: &A1Range, value: &str) -> Result<()> {
        let row = range.start.row.ok_or_else(|| WorkspaceError::InvalidRange(range.to_string()))?;
        let col = range.start.col;

        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(&range.sheet)
            .ok_or_else(|| WorkspaceError::SheetNotFound(range.sheet.clone()))?;

        if grid.len() <= row {
            grid.resize_with(row + 1, Vec::new);
        }
        let cells = &mut grid[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkspaceService for Spreadsheet {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "read_sheet".into(),
                description: "Read a range of values from the sheet.".into(),
                parameters: vec![
                    ParameterSchema::optional("range_", "string", "A1 notation range (e.g., \"Sheet1!A:D\")")
                        .with_default(json!(DEFAULT_READ_RANGE)),
                ],
                default_arguments: json!({"range_": "Sheet1!A1:D10"}).as_object().cloned(),
                examples: vec![json!({"range_": "Sheet1!A1:D10"})],
            },
            ToolSpec {
                name: "append_row".into(),
                description: "Append a new row to the sheet.".into(),
                parameters: vec![ParameterSchema::required("values", "array", "List of cell values")],
                default_arguments: None,
                examples: vec![json!({"values": ["Alice", "alice@example.com", "Data Analyst"]})],
            },
            ToolSpec {
                name: "update_cell".into(),
                description: "Update a specific cell in the sheet.".into(),
                parameters: vec![
                    ParameterSchema::required("range_", "string", "A1 notation of the cell (e.g., \"Sheet1!B2\")"),
                    ParameterSchema::required("value", "string", "New value for the cell"),
                ],
                default_arguments: None,
                examples: vec![json!({"range_": "Sheet1!C2", "value": "Senior Developer"})],
            },
        ]
    }

    async fn call(&self, tool: &str, arguments: &Arguments) -> Result<ProviderResponse> {
        match tool {
            "read_sheet" => {
                let range: A1Range = optional_str(arguments, "range_")?.unwrap_or(DEFAULT_READ_RANGE).parse()?;
                let values = self.read(&range).await?;
                Ok(ProviderResponse::structured(json!(values)))
            }
            "append_row" => {
                let values = require_values(arguments, "values")?;
                let width = values.len().max(1);
                let row = self.append(DEFAULT_SHEET, values).await?;
                Ok(ProviderResponse::structured(json!({
                    "updates": {
                        "updatedRange": format!("{DEFAULT_SHEET}!A{row}:{}{row}", column_name(width - 1)),
                        "updatedRows": 1,
                        "updatedCells": width,
                    }
                })))
            }
            "update_cell" => {
                let range: A1Range = require_str(arguments, "range_")?.parse()?;
                let value = require_str(arguments, "value")?;
                self.update(&range, value).await?;

                let cell = A1Range {
                    sheet: range.sheet.clone(),
                    start: range.start,
                    end: range.start,
                };
                Ok(ProviderResponse::structured(json!({
                    "updated": {"updatedRange": cell.to_string(), "updatedCells": 1}
                })))
            }
            other => Err(WorkspaceError::UnknownTool(other.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::{CallStatus, ContentPart};

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_a1() {
        let range: A1Range = "Sheet1!A1:D10".parse().unwrap();
        assert_eq!(range.sheet, "Sheet1");
        assert_eq!(range.start, CellRef { col: 0, row: Some(0) });
        assert_eq!(range.end, CellRef { col: 3, row: Some(9) });

        let columns: A1Range = "Sheet1!A:D".parse().unwrap();
        assert_eq!(columns.start.row, None);
        assert_eq!(columns.to_string(), "Sheet1!A:D");

        let cell: A1Range = "C2".parse().unwrap();
        assert_eq!(cell.sheet, DEFAULT_SHEET);
        assert!(cell.is_single_cell());
        assert_eq!(cell.to_string(), "Sheet1!C2");

        let quoted: A1Range = "'Q3 Hires'!AA1".parse().unwrap();
        assert_eq!(quoted.sheet, "Q3 Hires");
        assert_eq!(quoted.start.col, 26);

        for bad in ["", "Sheet1!", "Sheet1!1:2", "Sheet1!D1:A1", "Sheet1!A0", "Sheet1!A5:A2", "Sheet1!ABCD1"] {
            assert!(bad.parse::<A1Range>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_a1_bounds() {
        let corner: A1Range = "Sheet1!XFD1048576".parse().unwrap();
        assert_eq!(corner.start, CellRef { col: MAX_COLUMNS - 1, row: Some(MAX_ROWS - 1) });

        for bad in [
            "Sheet1!A1048577",
            "Sheet1!A99999999",
            "Sheet1!A18446744073709551615",
            "Sheet1!XFE1",
            "Sheet1!A1:ZZZ2",
        ] {
            assert!(matches!(bad.parse::<A1Range>(), Err(WorkspaceError::InvalidRange(_))), "{bad} should not parse");
        }
    }

    #[tokio::test]
    async fn test_update_out_of_bounds_is_rejected() {
        let sheet = Spreadsheet::seeded();

        let err = sheet
            .call("update_cell", &args(json!({"range_": "Sheet1!A18446744073709551615", "value": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidRange(_)));

        let rows = sheet.read(&"Sheet1!A:D".parse().unwrap()).await.unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[tokio::test]
    async fn test_read_range() {
        let sheet = Spreadsheet::seeded();

        let response = sheet.call("read_sheet", &args(json!({"range_": "Sheet1!A2:B3"}))).await.unwrap();
        assert_eq!(
            response.content[0],
            ContentPart::Structured(json!([["John Doe", "john@example.com"], ["Jane Smith", "jane@example.com"]]))
        );

        let all = sheet.call("read_sheet", &Arguments::new()).await.unwrap();
        let ContentPart::Structured(rows) = &all.content[0] else {
            panic!("expected rows");
        };
        assert_eq!(rows.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_append_then_update() {
        let sheet = Spreadsheet::seeded();

        let appended = sheet
            .call("append_row", &args(json!({"values": ["Alice", "alice@example.com", "Data Analyst"]})))
            .await
            .unwrap();
        assert_eq!(
            appended.content[0],
            ContentPart::Structured(json!({
                "updates": {"updatedRange": "Sheet1!A5:C5", "updatedRows": 1, "updatedCells": 3}
            }))
        );

        sheet
            .call("update_cell", &args(json!({"range_": "Sheet1!D5", "value": "Applied"})))
            .await
            .unwrap();
        let row = sheet.read(&"Sheet1!A5:D5".parse().unwrap()).await.unwrap();
        assert_eq!(row, vec![vec!["Alice", "alice@example.com", "Data Analyst", "Applied"]]);

        sheet
            .call("update_cell", &args(json!({"range_": "Sheet1!F8", "value": "x"})))
            .await
            .unwrap();
        let grown = sheet.read(&"Sheet1!F8".parse().unwrap()).await.unwrap();
        assert_eq!(grown, vec![vec!["x"]]);
    }

    #[tokio::test]
    async fn test_errors() {
        let sheet = Spreadsheet::seeded();

        assert!(matches!(
            sheet.call("read_sheet", &args(json!({"range_": "Payroll!A1"}))).await,
            Err(WorkspaceError::SheetNotFound(_))
        ));
        assert!(matches!(
            sheet.call("update_cell", &args(json!({"range_": "Sheet1!C", "value": "x"}))).await,
            Err(WorkspaceError::InvalidRange(_))
        ));
        assert!(matches!(
            sheet.call("append_row", &args(json!({"values": "Alice"}))).await,
            Err(WorkspaceError::InvalidArgument { .. })
        ));

        let ok = sheet.call("read_sheet", &args(json!({"range_": "Sheet1!Z1:Z9"}))).await.unwrap();
        assert_eq!(ok.status, CallStatus::Success);
    }
}
