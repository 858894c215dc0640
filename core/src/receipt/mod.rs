// repairdesk/src/receipt/mod.rs

//! Printable intake receipt.
//!
//! Rendering is pure: the same [`ReceiptData`] always yields the same bytes,
//! and nothing here validates or mutates the order. Absent optional values
//! print as a dash.

pub mod encoding;
pub mod pdf;

use crate::order::Order;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use encoding::wrap;
use pdf::{Font, PdfPage, PAGE_HEIGHT, PAGE_WIDTH};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

pub const PDF_MIME: &str = "application/pdf";

const DASH: &str = "-";
const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 10.0;
const LINE_GAP: f32 = 14.0;

const TERMS: [&str; 4] = [
  "1. Devices not collected within 90 days of the completion notice may be disposed of.",
  "2. The service is not responsible for data loss. Please back up your device.",
  "3. Repairs that require additional cost are started only after customer approval.",
  "4. Present this receipt or the receipt code and access code when collecting the device.",
];

#[derive(Debug, Error)]
pub enum RenderError {
  #[error("PDF generation failed: {0}")]
  Failed(#[from] anyhow::Error),
}

/// Everything printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptData {
  pub business_name: String,
  pub receipt_code: String,
  pub access_code: String,
  pub created_at: DateTime<Utc>,
  pub customer_name: String,
  pub customer_phone: String,
  pub address: String,
  pub device_type: String,
  pub serial_number: Option<String>,
  pub accessories: Vec<String>,
  pub issue: String,
  pub estimated_cost: Option<Decimal>,
  pub tracking_link: Option<String>,
}

impl ReceiptData {
  pub fn from_order(order: &Order, business_name: &str, tracking_link: Option<String>) -> Self {
    Self {
      business_name: business_name.to_string(),
      receipt_code: order.receipt_code.clone(),
      access_code: order.access_code.clone(),
      created_at: order.created_at,
      customer_name: order.customer.name.clone(),
      customer_phone: order.customer.phone.clone(),
      address: order.customer.address.clone(),
      device_type: order.device.device_type.clone(),
      serial_number: order.device.serial_number.clone(),
      accessories: order.device.accessories.clone(),
      issue: order.device.issue.clone(),
      estimated_cost: order.estimated_cost,
      tracking_link,
    }
  }

  pub fn file_name(&self) -> String {
    format!("{}.pdf", self.receipt_code)
  }
}

pub trait ReceiptRenderer: Send + Sync {
  fn render(&self, data: &ReceiptData) -> Result<Bytes, RenderError>;
}

fn or_dash(value: &str) -> &str {
  if value.trim().is_empty() {
    DASH
  } else {
    value
  }
}

/// Characters of Helvetica at `size` that fit in `width`, estimated at half an em each.
fn chars_for(width: f32, size: f32) -> usize {
  (width / (size * 0.5)) as usize
}

/// One-page A4 receipt: header, customer and device panels side by side, the
/// reported issue, terms, and two signature boxes.
#[derive(Debug, Clone, Default)]
pub struct PdfReceiptRenderer;

impl PdfReceiptRenderer {
  fn panel(page: &mut PdfPage, x: f32, top: f32, width: f32, height: f32, title: &str, rows: &[(&str, String)]) {
    page.rect(x, top - height, width, height);
    page.text(Font::Bold, 11.0, x + 8.0, top - 16.0, title);
    page.line(x, top - 22.0, x + width, top - 22.0);

    let label_width = 70.0;
    let value_chars = chars_for(width - label_width - 16.0, BODY_SIZE);
    let floor = top - height + 8.0;
    let mut y = top - 38.0;
    for (label, value) in rows {
      if y < floor {
        break;
      }
      page.text(Font::Bold, BODY_SIZE, x + 8.0, y, label);
      let lines = wrap(value, value_chars);
      if lines.is_empty() {
        page.text(Font::Regular, BODY_SIZE, x + 8.0 + label_width, y, DASH);
        y -= LINE_GAP;
      }
      for line in lines {
        if y < floor {
          break;
        }
        page.text(Font::Regular, BODY_SIZE, x + 8.0 + label_width, y, &line);
        y -= LINE_GAP;
      }
    }
  }
}

impl ReceiptRenderer for PdfReceiptRenderer {
  #[instrument(name = "receipt::render", skip_all, fields(receipt_code = %data.receipt_code))]
  fn render(&self, data: &ReceiptData) -> Result<Bytes, RenderError> {
    let mut page = PdfPage::new();
    let right = PAGE_WIDTH - MARGIN;
    let content_width = right - MARGIN;

    // Header
    let mut y = PAGE_HEIGHT - 60.0;
    page
      .text(Font::Bold, 18.0, MARGIN, y, or_dash(&data.business_name))
      .text(Font::Bold, 12.0, right - 170.0, y, "SERVICE RECEIPT");
    y -= 20.0;
    page
      .text(Font::Regular, BODY_SIZE, MARGIN, y, &format!("Receipt code: {}", or_dash(&data.receipt_code)))
      .text(
        Font::Regular,
        BODY_SIZE,
        right - 170.0,
        y,
        &format!("Date: {}", data.created_at.format("%d.%m.%Y %H:%M")),
      );
    y -= LINE_GAP;
    page.text(
      Font::Regular,
      BODY_SIZE,
      MARGIN,
      y,
      &format!("Access code: {}", or_dash(&data.access_code)),
    );
    y -= 10.0;
    page.line(MARGIN, y, right, y);

    // Customer / device panels
    let panel_top = y - 15.0;
    let panel_height = 150.0;
    let gap = 15.0;
    let panel_width = (content_width - gap) / 2.0;
    let accessories = if data.accessories.is_empty() {
      DASH.to_string()
    } else {
      data.accessories.join(", ")
    };
    Self::panel(
      &mut page,
      MARGIN,
      panel_top,
      panel_width,
      panel_height,
      "Customer",
      &[
        ("Name", or_dash(&data.customer_name).to_string()),
        ("Phone", or_dash(&data.customer_phone).to_string()),
        ("Address", or_dash(&data.address).to_string()),
      ],
    );
    Self::panel(
      &mut page,
      MARGIN + panel_width + gap,
      panel_top,
      panel_width,
      panel_height,
      "Device",
      &[
        ("Device", or_dash(&data.device_type).to_string()),
        ("Serial no", data.serial_number.clone().unwrap_or_else(|| DASH.to_string())),
        ("Accessories", accessories),
        (
          "Estimate",
          data
            .estimated_cost
            .map(|c| c.normalize().to_string())
            .unwrap_or_else(|| DASH.to_string()),
        ),
      ],
    );

    // Issue
    let issue_top = panel_top - panel_height - 15.0;
    let issue_height = 100.0;
    page.rect(MARGIN, issue_top - issue_height, content_width, issue_height);
    page.text(Font::Bold, 11.0, MARGIN + 8.0, issue_top - 16.0, "Reported issue");
    let mut line_y = issue_top - 34.0;
    let issue_lines = wrap(&data.issue, chars_for(content_width - 16.0, BODY_SIZE));
    if issue_lines.is_empty() {
      page.text(Font::Regular, BODY_SIZE, MARGIN + 8.0, line_y, DASH);
    }
    for line in issue_lines.iter().take(5) {
      page.text(Font::Regular, BODY_SIZE, MARGIN + 8.0, line_y, line);
      line_y -= LINE_GAP;
    }

    // Tracking and terms
    let mut terms_y = issue_top - issue_height - 25.0;
    let tracking = data.tracking_link.as_deref().unwrap_or(DASH);
    page.text(Font::Regular, BODY_SIZE, MARGIN, terms_y, &format!("Track your repair: {}", tracking));
    terms_y -= 25.0;
    page.text(Font::Bold, 11.0, MARGIN, terms_y, "Terms");
    terms_y -= 16.0;
    for term in TERMS {
      for line in wrap(term, chars_for(content_width, 9.0)) {
        page.text(Font::Regular, 9.0, MARGIN, terms_y, &line);
        terms_y -= 12.0;
      }
    }

    // Signatures
    let sig_height = 80.0;
    let sig_width = (content_width - 35.0) / 2.0;
    let sig_y = 80.0;
    for (i, caption) in ["Customer signature", "Received by (service)"].iter().enumerate() {
      let x = MARGIN + i as f32 * (sig_width + 35.0);
      page.rect(x, sig_y, sig_width, sig_height);
      page.text(Font::Regular, 9.0, x + 8.0, sig_y + sig_height - 14.0, caption);
    }

    Ok(Bytes::from(page.finish()))
  }
}
