// repairdesk/src/receipt/pdf.rs

//! Minimal single-page PDF writer.
//!
//! Only what a receipt needs: two built-in fonts, text, rectangles and lines.
//! Output is byte-for-byte deterministic for the same drawing calls.

use super::encoding::pdf_literal;
use std::fmt::Write as _;

/// A4 in points.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
  Regular,
  Bold,
}

impl Font {
  fn resource(self) -> &'static str {
    match self {
      Font::Regular => "F1",
      Font::Bold => "F2",
    }
  }
}

/// Fluent builder for one page's content stream.
#[derive(Debug)]
pub struct PdfPage {
  content: Vec<u8>,
}

impl Default for PdfPage {
  fn default() -> Self {
    Self::new()
  }
}

impl PdfPage {
  pub fn new() -> Self {
    let mut page = Self {
      content: Vec::with_capacity(8 * 1024),
    };
    page.op("0.8 w");
    page
  }

  fn op(&mut self, op: &str) -> &mut Self {
    self.content.extend_from_slice(op.as_bytes());
    self.content.push(b'\n');
    self
  }

  /// Draws `s` with its baseline starting at (`x`, `y`).
  pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, s: &str) -> &mut Self {
    let head = format!("BT /{} {} Tf {} {} Td (", font.resource(), size, x, y);
    self.content.extend_from_slice(head.as_bytes());
    self.content.extend_from_slice(&pdf_literal(s));
    self.content.extend_from_slice(b") Tj ET\n");
    self
  }

  pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
    self.op(&format!("{} {} {} {} re S", x, y, width, height))
  }

  pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
    self.op(&format!("{} {} m {} {} l S", x1, y1, x2, y2))
  }

  /// Serializes the document: catalog, page tree, page, two fonts, content.
  pub fn finish(&self) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(self.content.len() + 1024);
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut page_dict = String::new();
    let _ = write!(
      page_dict,
      "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
       /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
      PAGE_WIDTH, PAGE_HEIGHT
    );

    let dictionaries = [
      "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
      "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
      page_dict,
      "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
      "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    let mut offsets = Vec::with_capacity(dictionaries.len() + 1);
    for (i, dict) in dictionaries.iter().enumerate() {
      offsets.push(out.len());
      out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, dict).as_bytes());
    }

    offsets.push(out.len());
    out.extend_from_slice(
      format!("{} 0 obj\n<< /Length {} >>\nstream\n", dictionaries.len() + 1, self.content.len()).as_bytes(),
    );
    out.extend_from_slice(&self.content);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1);
    for offset in &offsets {
      let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
      xref,
      "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
      offsets.len() + 1,
      xref_at
    );
    out.extend_from_slice(xref.as_bytes());
    out
  }
}
