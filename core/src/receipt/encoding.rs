// repairdesk/src/receipt/encoding.rs

//! Text encoding for the built-in PDF fonts.
//!
//! The standard Type1 fonts only cover WinAnsi (windows-1252). Turkish letters
//! outside that set are transliterated; anything else left unmappable prints
//! as `?`.

use tracing::instrument;

fn transliterate(c: char) -> Option<char> {
  match c {
    'ğ' => Some('g'),
    'Ğ' => Some('G'),
    'ı' => Some('i'),
    'İ' => Some('I'),
    'ş' => Some('s'),
    'Ş' => Some('S'),
    _ => None,
  }
}

/// Encodes `s` as windows-1252 bytes.
#[instrument(level = "trace", skip(s))]
pub fn encode_win1252(s: &str) -> Vec<u8> {
  let mut out = Vec::with_capacity(s.len());
  let mut buf = [0u8; 4];
  for c in s.chars() {
    let c = transliterate(c).unwrap_or(c);
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    if had_errors {
      out.push(b'?');
    } else {
      out.extend_from_slice(&bytes);
    }
  }
  out
}

/// Encodes and escapes `s` for use inside a PDF literal string `( ... )`.
pub fn pdf_literal(s: &str) -> Vec<u8> {
  let mut out = Vec::with_capacity(s.len() + 2);
  for byte in encode_win1252(s) {
    match byte {
      b'(' | b')' | b'\\' => {
        out.push(b'\\');
        out.push(byte);
      }
      b'\n' | b'\r' => out.push(b' '),
      _ => out.push(byte),
    }
  }
  out
}

/// Greedy word wrap to at most `max_chars` characters per line. Words longer
/// than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
  let max_chars = max_chars.max(1);
  let mut lines = Vec::new();
  let mut current = String::new();

  for word in text.split_whitespace() {
    let mut word: Vec<char> = word.chars().collect();
    while word.len() > max_chars {
      if !current.is_empty() {
        lines.push(std::mem::take(&mut current));
      }
      lines.push(word.drain(..max_chars).collect());
    }
    let word: String = word.into_iter().collect();
    if word.is_empty() {
      continue;
    }
    let needed = if current.is_empty() {
      word.chars().count()
    } else {
      current.chars().count() + 1 + word.chars().count()
    };
    if needed > max_chars && !current.is_empty() {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(&word);
  }
  if !current.is_empty() {
    lines.push(current);
  }
  lines
}
