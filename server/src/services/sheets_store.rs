// repairdesk_server/src/services/sheets_store.rs

//! [`RowStore`] over a spreadsheet values API (`/v4/spreadsheets/{id}/values`).
//!
//! Row 1 of the sheet is the header; data row `index` lives on sheet row `index + 2`.

use super::error_chain;
use crate::config::SheetsConfig;
use async_trait::async_trait;
use repairdesk::store::schema::{column_letter, COLUMNS};
use repairdesk::store::{CellUpdate, Row, RowStore, StoreError};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Deserialize)]
struct ValueRange {
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
  updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
  updated_range: String,
}

pub struct HttpRowStore {
  client: Client,
  config: SheetsConfig,
}

impl HttpRowStore {
  pub fn new(client: Client, config: SheetsConfig) -> Self {
    Self { client, config }
  }

  fn last_column(&self) -> String {
    column_letter(COLUMNS.len() - 1)
  }

  /// `'Orders'!A2:R`, with the sheet name quoted.
  fn range(&self, cells: &str) -> String {
    format!("'{}'!{}", self.config.sheet_name.replace('\'', "''"), cells)
  }

  fn url(&self, tail: &[&str]) -> Result<Url, StoreError> {
    let mut url = Url::parse(&self.config.api_url)
      .map_err(|e| StoreError::Request(anyhow::anyhow!("invalid SHEETS_API_URL: {}", e)))?;
    url
      .path_segments_mut()
      .map_err(|_| StoreError::Request(anyhow::anyhow!("SHEETS_API_URL cannot be a base URL")))?
      .pop_if_empty()
      .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str()])
      .extend(tail);
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, StoreError> {
    let response = request
      .bearer_auth(&self.config.api_token)
      .send()
      .await
      .map_err(|e| StoreError::Request(anyhow::anyhow!(error_chain(&e))))?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
      status: status.as_u16(),
      message,
    })
  }

  async fn read_range(&self, cells: &str) -> Result<Vec<Row>, StoreError> {
    let url = self.url(&["values", &self.range(cells)])?;
    let response = self.send(self.client.get(url)).await?;
    let body: ValueRange = response
      .json()
      .await
      .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
    Ok(body.values.into_iter().map(to_row).collect())
  }
}

fn cell_text(value: Value) -> String {
  match value {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn to_row(values: Vec<Value>) -> Row {
  values.into_iter().map(cell_text).collect()
}

/// Sheet row number of the first cell in an A1 range such as `'Orders'!A12:R12`.
fn first_row_number(range: &str) -> Option<usize> {
  let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
  let first = cells.split(':').next()?;
  let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
  digits.parse().ok()
}

#[async_trait]
impl RowStore for HttpRowStore {
  #[instrument(name = "sheets::append", skip_all)]
  async fn append(&self, row: Row) -> Result<usize, StoreError> {
    let url = self.url(&["values", &format!("{}:append", self.range("A1"))])?;
    let request = self
      .client
      .post(url)
      .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
      .json(&json!({ "values": [row] }));
    let response = self.send(request).await?;
    let body: AppendResponse = response
      .json()
      .await
      .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

    let row_number = first_row_number(&body.updates.updated_range)
      .filter(|n| *n >= FIRST_DATA_ROW)
      .ok_or_else(|| StoreError::InvalidResponse(format!("unexpected updated range '{}'", body.updates.updated_range)))?;
    debug!(range = %body.updates.updated_range, "Row appended.");
    Ok(row_number - FIRST_DATA_ROW)
  }

  #[instrument(name = "sheets::scan_all", skip_all)]
  async fn scan_all(&self) -> Result<Vec<Row>, StoreError> {
    self
      .read_range(&format!("A{}:{}", FIRST_DATA_ROW, self.last_column()))
      .await
  }

  async fn read_row(&self, index: usize) -> Result<Option<Row>, StoreError> {
    let n = index + FIRST_DATA_ROW;
    let mut rows = self.read_range(&format!("A{n}:{}{n}", self.last_column())).await?;
    Ok(rows.pop().filter(|row| row.iter().any(|cell| !cell.trim().is_empty())))
  }

  #[instrument(name = "sheets::update_cells", skip(self, updates), fields(cells = updates.len()))]
  async fn update_cells(&self, index: usize, updates: &[CellUpdate]) -> Result<(), StoreError> {
    if updates.is_empty() {
      return Ok(());
    }
    let n = index + FIRST_DATA_ROW;
    let data: Vec<Value> = updates
      .iter()
      .map(|update| {
        json!({
          "range": self.range(&format!("{}{}", update.column.letter(), n)),
          "values": [[update.value]],
        })
      })
      .collect();
    let url = self.url(&["values:batchUpdate"])?;
    let request = self
      .client
      .post(url)
      .json(&json!({ "valueInputOption": "RAW", "data": data }));
    self.send(request).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store(sheet_name: &str) -> HttpRowStore {
    HttpRowStore::new(
      Client::new(),
      SheetsConfig {
        api_url: "https://sheets.example.test/".to_string(),
        spreadsheet_id: "sheet-1".to_string(),
        sheet_name: sheet_name.to_string(),
        api_token: "token".to_string(),
      },
    )
  }

  #[test]
  fn append_response_range_maps_to_data_index() {
    assert_eq!(first_row_number("'Orders'!A12:R12"), Some(12));
    assert_eq!(first_row_number("Orders!B3"), Some(3));
    assert_eq!(first_row_number("garbage"), None);
  }

  #[test]
  fn ranges_quote_the_sheet_name() {
    let store = store("Kim's Orders");
    assert_eq!(store.range("A2:R"), "'Kim''s Orders'!A2:R");
    assert_eq!(store.last_column(), "R");
  }

  #[test]
  fn urls_encode_the_range_segment() {
    let url = store("Orders").url(&["values", "'Orders'!A2:R"]).unwrap();
    assert!(url
      .as_str()
      .starts_with("https://sheets.example.test/v4/spreadsheets/sheet-1/values/"));
    assert!(!url.path().contains(' '));
  }

  #[test]
  fn non_string_cells_are_stringified() {
    let row = to_row(vec![json!(7), Value::Null, json!("SRV-2026-00001")]);
    assert_eq!(row, vec!["7".to_string(), String::new(), "SRV-2026-00001".to_string()]);
  }
}
