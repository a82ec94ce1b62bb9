//! Common types shared by the MT103 and pacs.008 sides of the converter.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Known MT103 block 4 field tags.
///
/// Only the customer-credit-transfer subset is supported. Tokenizers reject
/// any other tag explicitly instead of carrying arbitrary strings around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldTag {
    /// :20: Sender's reference.
    Tag20,
    /// :23B: Bank operation code.
    Tag23B,
    /// :32A: Value date / currency / interbank settled amount.
    Tag32A,
    /// :33B: Currency / instructed amount.
    Tag33B,
    /// :50A: Ordering customer (BIC form).
    Tag50A,
    /// :50K: Ordering customer (name and address form).
    Tag50K,
    /// :59: Beneficiary customer.
    Tag59,
    /// :70: Remittance information.
    Tag70,
    /// :71A: Details of charges.
    Tag71A,
}

impl FieldTag {
    /// The tag as it appears between colons in the message text.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTag::Tag20 => "20",
            FieldTag::Tag23B => "23B",
            FieldTag::Tag32A => "32A",
            FieldTag::Tag33B => "33B",
            FieldTag::Tag50A => "50A",
            FieldTag::Tag50K => "50K",
            FieldTag::Tag59 => "59",
            FieldTag::Tag70 => "70",
            FieldTag::Tag71A => "71A",
        }
    }
}

impl FromStr for FieldTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "20" => Ok(FieldTag::Tag20),
            "23B" => Ok(FieldTag::Tag23B),
            "32A" => Ok(FieldTag::Tag32A),
            "33B" => Ok(FieldTag::Tag33B),
            "50A" => Ok(FieldTag::Tag50A),
            "50K" => Ok(FieldTag::Tag50K),
            "59" => Ok(FieldTag::Tag59),
            "70" => Ok(FieldTag::Tag70),
            "71A" => Ok(FieldTag::Tag71A),
            _ => Err(Error::ParseError(format!("Unknown MT103 field tag: {}", s))),
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged fields extracted from block 4. A repeated tag overwrites the
/// earlier value; this mirrors the upstream behavior and is intentional.
pub type TaggedFieldSet = BTreeMap<FieldTag, String>;

/// Raw SWIFT blocks keyed by block number (1..=5).
pub type BlockSet = BTreeMap<u8, String>;

/// Charge bearer code. MT103 uses OUR/BEN/SHA, pacs.008 uses DEBT/CRED/SHAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeBearer {
    /// All charges borne by the debtor (OUR / DEBT).
    Our,
    /// All charges borne by the creditor (BEN / CRED).
    Ben,
    /// Charges shared (SHA / SHAR).
    Sha,
}

impl ChargeBearer {
    /// MT103 :71A: code.
    pub fn mt_code(&self) -> &'static str {
        match self {
            ChargeBearer::Our => "OUR",
            ChargeBearer::Ben => "BEN",
            ChargeBearer::Sha => "SHA",
        }
    }

    /// pacs.008 ChrgBr code.
    pub fn iso_code(&self) -> &'static str {
        match self {
            ChargeBearer::Our => "DEBT",
            ChargeBearer::Ben => "CRED",
            ChargeBearer::Sha => "SHAR",
        }
    }

    /// Map an MT103 :71A: value. Unknown values fall back to shared charges.
    pub fn from_mt_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "OUR" => ChargeBearer::Our,
            "BEN" => ChargeBearer::Ben,
            _ => ChargeBearer::Sha,
        }
    }

    /// Map a pacs.008 ChrgBr value. Unknown values fall back to shared charges.
    pub fn from_iso_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "DEBT" => ChargeBearer::Our,
            "CRED" => ChargeBearer::Ben,
            _ => ChargeBearer::Sha,
        }
    }
}

/// Map an MT103 :23B: operation code to a pacs.008 service level code.
pub fn service_level_to_iso(mt_code: &str) -> &'static str {
    match mt_code.trim().to_uppercase().as_str() {
        "CRTS" => "NURG",
        _ => "NORM",
    }
}

/// Map a pacs.008 service level code back to an MT103 :23B: code.
pub fn service_level_from_iso(iso_code: &str) -> &'static str {
    match iso_code.trim().to_uppercase().as_str() {
        "NURG" => "CRTS",
        _ => "CRED",
    }
}

/// A debtor or creditor party.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Party {
    /// Party name.
    pub name: String,

    /// Postal address lines (zero or more).
    pub address_lines: Vec<String>,

    /// Account identification, without the leading `/` of the MT103 form.
    pub account: Option<String>,
}

/// Intermediate representation of one customer credit transfer, produced by
/// one mapper and consumed by the opposite renderer. Lives only for the
/// duration of a single conversion call.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedTransaction {
    /// Transaction reference (:20: / PmtId).
    pub reference: String,

    /// MT103 :23B: operation code (service level on the pacs.008 side).
    pub service_level: String,

    /// Interbank settlement date.
    pub settlement_date: NaiveDate,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Settled amount. Always a decimal, never floating point.
    pub amount: Decimal,

    /// Who pays the transfer fees.
    pub charge_bearer: ChargeBearer,

    /// Ordering customer.
    pub debtor: Party,

    /// Beneficiary customer.
    pub creditor: Party,

    /// Unstructured remittance information, omitted when blank.
    pub remittance: Option<String>,
}

/// Collected validation output. Any error entry blocks conversion;
/// warnings are informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Hard failures, in check order.
    pub errors: Vec<String>,

    /// Non-blocking findings (e.g. unrecognized :23B: code).
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hard failure.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a non-blocking warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// True when no hard failure was recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Placeholder routing identifiers used where the source message carries no
/// agent detail. Kept as configuration data so the values can be swapped
/// without touching mapping logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankDirectory {
    /// BIC used in the MT103 basic header (block 1) and as instructing agent.
    pub sender_bic: String,

    /// BIC used in the MT103 application header (block 2) and as instructed agent.
    pub receiver_bic: String,

    /// Placeholder debtor agent BIC.
    pub debtor_agent_bic: String,

    /// Placeholder creditor agent BIC.
    pub creditor_agent_bic: String,

    /// Placeholder checksum for the block 5 trailer.
    pub trailer_checksum: String,
}

impl Default for BankDirectory {
    fn default() -> Self {
        Self {
            sender_bic: "BANKDEFAXXX".to_string(),
            receiver_bic: "BANKFRPPXXX".to_string(),
            debtor_agent_bic: "BANKDEFAXXX".to_string(),
            creditor_agent_bic: "BANKFRPPXXX".to_string(),
            trailer_checksum: "000000000000".to_string(),
        }
    }
}

/// Parse an MT103 amount (comma decimal separator) into a decimal.
pub fn parse_mt_amount(raw: &str) -> Result<Decimal> {
    // SWIFT amounts may end with a bare separator, e.g. "10000,".
    let normalized = raw.trim().replace(',', ".");
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);
    Decimal::from_str(normalized).map_err(|_| Error::InvalidAmount(raw.to_string()))
}

/// Format an amount for pacs.008: dot separator, exactly 2 fractional digits.
pub fn format_iso_amount(amount: &Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Format an amount for MT103: comma separator, exactly 2 fractional digits.
pub fn format_mt_amount(amount: &Decimal) -> String {
    format_iso_amount(amount).replace('.', ",")
}
