//! HTTP client for the archive's TAP sync endpoint.
//!
//! Queries are ADQL, sent pre-encoded on the `query` parameter with
//! `format=csv`; responses are a header row followed by comma-separated
//! data rows. Only the four queries the synchronizer needs are exposed:
//! record count, full identifier list, full row fetch, and rows modified
//! at or after a marker date.

use reqwest::Client;
use std::collections::HashSet;

use crate::error::{ArchiveError, ArchiveResult};
use crate::values::CellValue;

/// One fetched record, cells already cast. `name` is the entity
/// identifier (the first selected column) kept raw for diffing.
#[derive(Debug, Clone)]
pub struct TapRow {
    pub name: String,
    pub cells: Vec<CellValue>,
}

pub struct TapClient {
    http: Client,
    base_url: String,
    table: String,
    columns: Vec<String>,
}

impl TapClient {
    pub fn new(base_url: &str, table: &str, columns: &[String]) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            columns: columns.to_vec(),
        }
    }

    fn key_column(&self) -> &str {
        &self.columns[0]
    }

    fn concat_columns(&self) -> String {
        self.columns.join(",")
    }

    async fn fetch_csv(&self, query: &str) -> ArchiveResult<Vec<Vec<String>>> {
        let url = format!("{}?query={}&format=csv", self.base_url, query);
        tracing::debug!("[Tap] GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Remote(status.as_u16()));
        }
        let body = response.text().await?;
        let mut rows = parse_csv(&body);
        if rows.is_empty() {
            return Err(ArchiveError::MalformedResponse(
                "response carried no header row".into(),
            ));
        }
        rows.remove(0);
        Ok(rows)
    }

    /// Total remote record count.
    pub async fn count(&self) -> ArchiveResult<i64> {
        let query = format!("select+count(*)+from+{}", self.table);
        let rows = self.fetch_csv(&query).await?;
        rows.first()
            .and_then(|r| r.first())
            .and_then(|c| c.parse::<i64>().ok())
            .ok_or_else(|| ArchiveError::MalformedResponse("unparsable count row".into()))
    }

    /// Full remote identifier list.
    pub async fn identifiers(&self) -> ArchiveResult<HashSet<String>> {
        let query = format!(
            "select+distinct+{}+from+{}",
            self.key_column(),
            self.table
        );
        let rows = self.fetch_csv(&query).await?;
        Ok(rows.into_iter().filter_map(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        })
        .collect())
    }

    /// Every remote record, for the bootstrap cycle.
    pub async fn all_rows(&self) -> ArchiveResult<Vec<TapRow>> {
        let query = format!("select+{}+from+{}", self.concat_columns(), self.table);
        let rows = self.fetch_csv(&query).await?;
        self.shape_rows(rows)
    }

    /// Records released or updated at or after the marker date.
    pub async fn rows_since(&self, marker: &str) -> ArchiveResult<Vec<TapRow>> {
        let query = format!(
            "select+{}+from+{}+where+releasedate%3E%3D%27{marker}%27+or+rowupdate%3E%3D%27{marker}%27",
            self.concat_columns(),
            self.table
        );
        let rows = self.fetch_csv(&query).await?;
        self.shape_rows(rows)
    }

    fn shape_rows(&self, raw: Vec<Vec<String>>) -> ArchiveResult<Vec<TapRow>> {
        let width = self.columns.len();
        let mut shaped = Vec::with_capacity(raw.len());
        for cells in raw {
            if cells.len() != width {
                return Err(ArchiveError::MalformedResponse(format!(
                    "row has {} cells, expected {width}",
                    cells.len()
                )));
            }
            shaped.push(TapRow {
                name: cells[0].clone(),
                cells: cells.iter().map(|c| CellValue::parse(c)).collect(),
            });
        }
        Ok(shaped)
    }
}

/// Line-based CSV parse, quote-aware within a line (`"a, b"` is one cell,
/// `""` inside quotes escapes a quote). The TAP service never emits
/// embedded newlines in the columns we select.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty())
        .map(parse_csv_line)
        .collect()
}

fn parse_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut cell));
            }
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}
