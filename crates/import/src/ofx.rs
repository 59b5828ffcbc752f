use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use extrato_core::{RawTransaction, Statement, StatementAccount};

/// Which of the two concrete syntaxes the statement arrived in. Decided once
/// by content sniffing, never re-sniffed mid-pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacySyntax {
    TagSoup,
    Xml,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported text encoding (not UTF-8, Latin-1 or ASCII)")]
    Encoding,
    #[error("invalid statement format: {0}")]
    InvalidFormat(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Tag-soup tags are unclosed `<TAG>value` pairs; the value runs until the
// next `<`. Closing tags (leading `/`) deliberately don't match.
re!(re_tag, r"<([A-Za-z0-9_.]+)>([^<]*)");
re!(re_stmttrn, r"(?s)<STMTTRN>(.*?)</STMTTRN>");

// ── Public API ───────────────────────────────────────────────────────────────

/// Parse raw bytes of a legacy bank-export file into a Statement,
/// auto-detecting the tag-soup and XML variants of the schema.
pub fn parse(data: &[u8]) -> Result<(LegacySyntax, Statement), ParseError> {
    let decoded = decode(data)?;
    let content = preprocess(&decoded)?;

    // Binary decision: an XML prolog marker selects the XML path. No format
    // field in the file is trusted.
    let syntax = if content.contains("<?xml") {
        LegacySyntax::Xml
    } else {
        LegacySyntax::TagSoup
    };

    let statement = match syntax {
        LegacySyntax::TagSoup => parse_tag_soup(&content)?,
        LegacySyntax::Xml => parse_xml(&content)?,
    };
    Ok((syntax, statement))
}

// ── Decoding & preprocessing ─────────────────────────────────────────────────

fn decode(data: &[u8]) -> Result<String, ParseError> {
    if let Ok(s) = std::str::from_utf8(data) {
        return Ok(s.to_string());
    }
    if data.contains(&0) {
        return Err(ParseError::Encoding);
    }
    // Latin-1 / Windows-1252-class fallback; every byte maps to a char, and a
    // plain-ASCII stream decodes identically.
    Ok(data.iter().map(|&b| b as char).collect())
}

/// Normalize line endings, discard the unstructured free-text header before
/// the structured root, and drop blank lines.
fn preprocess(raw: &str) -> Result<String, ParseError> {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let root = normalized.find("<OFX>");
    let prolog = normalized.find("<?xml");
    let start = match (root, prolog) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => {
            return Err(ParseError::InvalidFormat(
                "no <OFX> root or XML prolog".to_string(),
            ))
        }
    };

    Ok(normalized[start..]
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

// ── Tag-soup path ────────────────────────────────────────────────────────────

/// Scan `<TAG>value` pairs, keeping the first occurrence of each tag.
/// Empty values count as absent.
fn scan_tags(content: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for cap in re_tag().captures_iter(content) {
        let name = cap[1].to_uppercase();
        let value = cap[2].trim().to_string();
        if !value.is_empty() {
            fields.entry(name).or_insert(value);
        }
    }
    fields
}

fn parse_tag_soup(content: &str) -> Result<Statement, ParseError> {
    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for cap in re_stmttrn().captures_iter(content) {
        let body = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        match transaction_from_fields(&scan_tags(body)) {
            Some(t) => transactions.push(t),
            None => {
                // Tolerance policy: sparse or non-conforming blocks are
                // dropped, not fatal.
                skipped += 1;
                tracing::debug!("dropping incomplete STMTTRN block");
            }
        }
    }

    build_statement(&scan_tags(content), transactions, skipped)
}

/// A transaction block missing any of {FITID, TRNTYPE, DTPOSTED, TRNAMT,
/// NAME}, or whose date/amount fails to parse, yields `None` and is skipped.
fn transaction_from_fields(fields: &HashMap<String, String>) -> Option<RawTransaction> {
    let fit_id = fields.get("FITID")?;
    let trn_type = fields.get("TRNTYPE")?;
    let posted = parse_legacy_date(fields.get("DTPOSTED")?)?;
    let amount_cents = parse_legacy_amount(fields.get("TRNAMT")?)?;
    let name = fields.get("NAME")?;

    Some(RawTransaction {
        fit_id: fit_id.clone(),
        trn_type: trn_type.clone(),
        posted,
        amount_cents,
        name: name.clone(),
        memo: fields.get("MEMO").cloned(),
        check_number: fields.get("CHECKNUM").cloned(),
    })
}

// ── XML path ─────────────────────────────────────────────────────────────────

/// Streaming element scanner: tracks the current element name and its
/// accumulated character content; closing a STMTTRN flushes the buffered
/// fields into one transaction.
fn parse_xml(content: &str) -> Result<Statement, ParseError> {
    let mut header: HashMap<String, String> = HashMap::new();
    let mut txn_fields: HashMap<String, String> = HashMap::new();
    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    let mut in_trn = false;
    let mut current = String::new();
    let mut text = String::new();

    let mut rest = content;
    while let Some(open) = rest.find('<') {
        let chunk = rest[..open].trim();
        if !chunk.is_empty() {
            text.push_str(chunk);
        }

        let close = rest[open..]
            .find('>')
            .ok_or_else(|| ParseError::InvalidFormat("unterminated tag".to_string()))?;
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        if tag.starts_with('?') || tag.starts_with('!') {
            continue;
        }

        if let Some(name) = tag.strip_prefix('/') {
            let name = name.trim().to_uppercase();
            if name == "STMTTRN" {
                match transaction_from_fields(&txn_fields) {
                    Some(t) => transactions.push(t),
                    None => {
                        skipped += 1;
                        tracing::debug!("dropping incomplete STMTTRN element");
                    }
                }
                txn_fields.clear();
                in_trn = false;
            } else if name == current && !text.is_empty() {
                let value = std::mem::take(&mut text);
                if in_trn {
                    txn_fields.entry(name).or_insert(value);
                } else {
                    // Account and period fields are set only from the first
                    // occurrence encountered.
                    header.entry(name).or_insert(value);
                }
            }
            text.clear();
            current.clear();
        } else if tag.ends_with('/') {
            text.clear();
        } else {
            let name = tag
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_uppercase();
            if name == "STMTTRN" {
                in_trn = true;
                txn_fields.clear();
            }
            current = name;
            text.clear();
        }
    }

    build_statement(&header, transactions, skipped)
}

// ── Shared statement assembly ────────────────────────────────────────────────

fn build_statement(
    fields: &HashMap<String, String>,
    transactions: Vec<RawTransaction>,
    skipped: usize,
) -> Result<Statement, ParseError> {
    let account_id = fields
        .get("ACCTID")
        .cloned()
        .ok_or(ParseError::MissingField("ACCTID"))?;

    let account = StatementAccount {
        bank_id: fields.get("BANKID").cloned(),
        account_id,
        account_type: fields
            .get("ACCTTYPE")
            .cloned()
            .unwrap_or_else(|| StatementAccount::DEFAULT_TYPE.to_string()),
    };

    Ok(Statement {
        account,
        transactions,
        period_start: fields.get("DTSTART").and_then(|v| parse_legacy_date(v)),
        period_end: fields.get("DTEND").and_then(|v| parse_legacy_date(v)),
        skipped_records: skipped,
    })
}

// ── Field parsing ────────────────────────────────────────────────────────────

/// Accepts a 14-digit (`yyyyMMddHHmmss`) or 8-digit (`yyyyMMdd`) numeric
/// prefix after stripping all non-digit characters; the calendar part is the
/// first 8 digits either way. Anything shorter is unparseable.
fn parse_legacy_date(s: &str) -> Option<NaiveDate> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    let y: i32 = digits[0..4].parse().ok()?;
    let m: u32 = digits[4..6].parse().ok()?;
    let d: u32 = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Optional sign and decimal point only. Locale separators are a document-
/// pipeline concern and are rejected here.
fn parse_legacy_amount(s: &str) -> Option<i64> {
    let dec = Decimal::from_str(s.trim()).ok()?;
    (dec * Decimal::from(100)).round().to_i64()
}

// ── Tests ────────────────────────────────────────────────────────────────────
