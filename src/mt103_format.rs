//! MT103 SWIFT format tokenizer and serializer.
//!
//! MT103 is the SWIFT FIN tagged-text message for customer credit transfers.
//! A message consists of brace-delimited blocks `{1:..}{2:..}{4:..}{5:..}`;
//! block 4 carries the tagged payment fields (`:20:`, `:32A:`, ...).

use crate::error::{Error, Result};
use crate::types::{
    format_mt_amount, BankDirectory, BlockSet, FieldTag, MappedTransaction, Party, TaggedFieldSet,
};
use chrono::{Datelike, NaiveDate, Utc};
use std::io::Write;
use std::str::FromStr;

/// A tokenized MT103 message: the raw text plus its blocks and tagged fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Mt103Message {
    /// Original input text, kept verbatim for validation.
    pub raw: String,

    /// Brace-delimited blocks keyed by block number. Empty when the
    /// fallback tokenizer had to be used.
    pub blocks: BlockSet,

    /// Tagged fields from block 4.
    pub fields: TaggedFieldSet,
}

impl Mt103Message {
    /// Tokenize a raw MT103 message.
    ///
    /// Blocks are extracted by brace matching; the tagged fields come from
    /// block 4. When block extraction fails (malformed or absent block
    /// markers), a tolerant line-by-line tokenizer is attempted as a last
    /// resort so that field-level validation can still report something
    /// useful. The fallback may produce different results than the primary
    /// tokenizer. Tokenization never fails outright; structural problems
    /// surface through validation instead.
    pub fn parse(raw: &str) -> Self {
        match extract_blocks(raw) {
            Ok(blocks) => {
                let fields = blocks
                    .get(&4)
                    .map(|body| tokenize_fields(body))
                    .unwrap_or_default();
                Mt103Message {
                    raw: raw.to_string(),
                    blocks,
                    fields,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "block extraction failed, using line tokenizer");
                Mt103Message {
                    raw: raw.to_string(),
                    blocks: BlockSet::new(),
                    fields: tokenize_lines(raw),
                }
            }
        }
    }

    /// Look up a field value.
    pub fn field(&self, tag: FieldTag) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }
}

/// Extract SWIFT blocks by brace matching with an explicit depth counter.
///
/// Braces may nest (the block 5 trailer contains `{CHK:...}`), so this scans
/// character by character instead of using a pattern. Content outside any
/// block is ignored. Fails when a block never closes or when no block is
/// found at all.
pub fn extract_blocks(raw: &str) -> Result<BlockSet> {
    let mut blocks = BlockSet::new();
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        let start = i;
        let mut depth = 0usize;
        let mut end = None;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let end = end.ok_or_else(|| {
            Error::Tokenize("unbalanced braces: block opened but never closed".to_string())
        })?;

        let inner = &raw[start + 1..end];
        match inner.split_once(':') {
            Some((number, content)) => match number.trim().parse::<u8>() {
                Ok(n @ 1..=5) => {
                    blocks.insert(n, content.to_string());
                }
                _ => {
                    tracing::debug!(block = number, "ignoring unknown SWIFT block");
                }
            },
            None => {
                tracing::debug!("ignoring block without a number prefix");
            }
        }
        i = end + 1;
    }

    if blocks.is_empty() {
        return Err(Error::Tokenize("no SWIFT blocks found in input".to_string()));
    }
    Ok(blocks)
}

/// Split a line on an MT103 tag boundary: `:` + 2 digits + optional
/// uppercase letter + `:`. Returns the tag text and the remainder.
fn split_tag_boundary(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let close = rest.find(':')?;
    let tag = &rest[..close];
    let mut chars = tag.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None, None) if a.is_ascii_digit() && b.is_ascii_digit() => {}
        (Some(a), Some(b), Some(c), None)
            if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_uppercase() => {}
        _ => return None,
    }
    Some((tag, &rest[close + 1..]))
}

/// Tokenize the content of block 4 into tagged fields.
///
/// Text between boundaries belongs to the preceding tag, with interior
/// newlines preserved (multi-line address and remittance fields). The
/// trailing `-` terminator line is dropped. Unknown tags are ignored
/// explicitly, including their continuation lines. A repeated tag
/// overwrites the earlier value.
pub fn tokenize_fields(block4: &str) -> TaggedFieldSet {
    let mut fields = TaggedFieldSet::new();
    let mut current: Option<FieldTag> = None;
    let mut value = String::new();
    // Set after an unknown tag so its continuation lines are dropped too.
    let mut ignoring = false;

    let flush = |tag: &mut Option<FieldTag>, value: &mut String, fields: &mut TaggedFieldSet| {
        if let Some(t) = tag.take() {
            fields.insert(t, value.trim().to_string());
        }
        value.clear();
    };

    for line in block4.lines() {
        if line.trim() == "-" {
            // End-of-text terminator before the closing brace.
            flush(&mut current, &mut value, &mut fields);
            ignoring = false;
            continue;
        }
        if let Some((tag_str, rest)) = split_tag_boundary(line) {
            flush(&mut current, &mut value, &mut fields);
            match FieldTag::from_str(tag_str) {
                Ok(tag) => {
                    current = Some(tag);
                    value.push_str(rest.trim());
                    ignoring = false;
                }
                Err(_) => {
                    tracing::debug!(tag = tag_str, "ignoring unsupported MT103 tag");
                    ignoring = true;
                }
            }
        } else if current.is_some() {
            value.push('\n');
            value.push_str(line.trim());
        } else if !ignoring && !line.trim().is_empty() {
            tracing::debug!("ignoring stray content before first tag");
        }
    }
    flush(&mut current, &mut value, &mut fields);

    fields
}

/// Fallback tokenizer: walk the whole message line by line, tolerant of
/// malformed or missing block markers. Used only when block extraction
/// fails; block-level validation still reports the structural problems.
pub fn tokenize_lines(raw: &str) -> TaggedFieldSet {
    tokenize_fields(raw)
}

/// Parse a party field (:50K:/:50A:/:59:) into name, address, and account.
///
/// The first line is the name unless it looks like an account (leading
/// digits or slash), in which case the first token after stripping the
/// leading `/` is the account and the second line becomes the name.
pub fn parse_party_field(text: &str) -> Party {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = lines.next().unwrap_or_default();
    let looks_like_account = first
        .chars()
        .next()
        .map(|c| c == '/' || c.is_ascii_digit())
        .unwrap_or(false);

    if looks_like_account {
        let account = first
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        let name = lines.next().unwrap_or_default().to_string();
        let address_lines: Vec<String> = lines.map(str::to_string).collect();
        Party {
            name,
            address_lines,
            account: if account.is_empty() { None } else { Some(account) },
        }
    } else {
        Party {
            name: first.to_string(),
            address_lines: lines.map(str::to_string).collect(),
            account: None,
        }
    }
}

/// Render a party back into MT103 field text: optional `/account` line,
/// then the name (35 chars max, `UNKNOWN` when absent), then each address
/// line (35 chars max). No trailing newline.
pub fn render_party_field(party: &Party) -> String {
    let mut out = String::new();
    if let Some(ref account) = party.account {
        if !account.trim().is_empty() {
            out.push('/');
            out.push_str(account.trim());
            out.push('\n');
        }
    }
    if party.name.trim().is_empty() {
        out.push_str("UNKNOWN");
    } else {
        out.push_str(&sanitize(&party.name, 35));
    }
    for line in &party.address_lines {
        if line.trim().is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&sanitize(line, 35));
    }
    out
}

/// Strip carriage returns, trim, and cap at `max` characters.
pub fn sanitize(value: &str, max: usize) -> String {
    let cleaned = value.replace('\r', "");
    let cleaned = cleaned.trim();
    match cleaned.char_indices().nth(max) {
        Some((idx, _)) => cleaned[..idx].to_string(),
        None => cleaned.to_string(),
    }
}

/// Serialize a mapped transaction to MT103 text.
pub fn render_mt103(tx: &MappedTransaction, directory: &BankDirectory) -> Result<String> {
    let mut out = Vec::new();
    write_mt103(tx, directory, &mut out)?;
    String::from_utf8(out).map_err(|e| Error::ConversionError(e.to_string()))
}

/// Write a mapped transaction as MT103 text to any destination
/// implementing `Write`.
///
/// Blocks 1 and 2 carry placeholder bank identifiers from the directory,
/// block 5 a placeholder checksum trailer; the source pacs.008 message has
/// no routing detail to derive them from.
pub fn write_mt103<W: Write>(
    tx: &MappedTransaction,
    directory: &BankDirectory,
    writer: &mut W,
) -> Result<()> {
    writeln!(
        writer,
        "{{1:F01{sender}0000000000}}{{2:O103{date}{sender}{receiver}0000000000}}{{4:",
        sender = directory.sender_bic,
        receiver = directory.receiver_bic,
        date = format_swift_date(&Utc::now().date_naive()),
    )?;

    writeln!(writer, ":20:{}", tx.reference)?;
    writeln!(writer, ":23B:{}", tx.service_level)?;
    writeln!(
        writer,
        ":32A:{}{}{}",
        format_swift_date(&tx.settlement_date),
        tx.currency,
        format_mt_amount(&tx.amount),
    )?;
    writeln!(writer, ":33B:{}{}", tx.currency, format_mt_amount(&tx.amount))?;
    writeln!(writer, ":50K:{}", render_party_field(&tx.debtor))?;
    writeln!(writer, ":59:{}", render_party_field(&tx.creditor))?;
    if let Some(ref remittance) = tx.remittance {
        if !remittance.trim().is_empty() {
            writeln!(writer, ":70:{}", sanitize(remittance, 140))?;
        }
    }
    writeln!(writer, ":71A:{}", tx.charge_bearer.mt_code())?;
    writeln!(writer, "-}}")?;
    writeln!(writer, "{{5:{{CHK:{}}}}}", directory.trailer_checksum)?;

    Ok(())
}

/// Parse a SWIFT date (yyMMdd) to a `NaiveDate`.
pub fn parse_swift_date(date_str: &str) -> Result<NaiveDate> {
    if date_str.len() != 6 || !date_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidDate(format!(
            "expected yyMMdd, got: {}",
            date_str
        )));
    }

    let year = date_str[0..2]
        .parse::<i32>()
        .map_err(|_| Error::InvalidDate(date_str.to_string()))?;
    let month = date_str[2..4]
        .parse::<u32>()
        .map_err(|_| Error::InvalidDate(date_str.to_string()))?;
    let day = date_str[4..6]
        .parse::<u32>()
        .map_err(|_| Error::InvalidDate(date_str.to_string()))?;

    // Assume 2000+ for years < 50, otherwise 1900+
    let full_year = if year < 50 { 2000 + year } else { 1900 + year };

    NaiveDate::from_ymd_opt(full_year, month, day)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{}-{}", full_year, month, day)))
}

/// Format a `NaiveDate` as a SWIFT date (yyMMdd).
pub fn format_swift_date(date: &NaiveDate) -> String {
    format!("{:02}{:02}{:02}", date.year() % 100, date.month(), date.day())
}
