//! Structural, business-rule, and schema-style validation.
//!
//! MT103 checks run over the tokenized message plus the raw text; every
//! check runs and all failures are collected, never short-circuited.
//! pacs.008 checks run the generated (or incoming) XML against a fixed
//! constraint table distilled from the pacs.008.001.08 schema subset this
//! converter emits, and report violations through category-keyed message
//! templates instead of raw library error text.

use crate::mt103_format::Mt103Message;
use crate::pacs008_format::{
    CreditTransferTransactionXml, Pacs008Document, PACS008_NAMESPACE,
};
use crate::types::{FieldTag, ValidationReport};

/// Blocks 1, 2, 4, 5 are mandatory; block 3 (user header) is optional.
const MANDATORY_BLOCKS: [u8; 4] = [1, 2, 4, 5];

/// Tags that must be present and non-blank in block 4. 50A/50K are checked
/// separately since they substitute for each other.
const MANDATORY_TAGS: [FieldTag; 7] = [
    FieldTag::Tag20,
    FieldTag::Tag23B,
    FieldTag::Tag32A,
    FieldTag::Tag33B,
    FieldTag::Tag59,
    FieldTag::Tag70,
    FieldTag::Tag71A,
];

/// Allowed :71A: charge codes.
const CHARGE_CODES: [&str; 3] = ["OUR", "BEN", "SHA"];

/// Recommended :23B: operation codes. Anything else is a warning only.
const OPERATION_CODES: [&str; 4] = ["CRED", "SPAY", "PHON", "HOLD"];

/// Validate a tokenized MT103 message against structural and business rules.
pub fn validate_mt103(msg: &Mt103Message) -> ValidationReport {
    let mut report = ValidationReport::new();

    let trimmed = msg.raw.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        report.add_error("Message must start with '{' and end with '}'.");
    }

    let opening = msg.raw.matches('{').count();
    let closing = msg.raw.matches('}').count();
    if opening != closing {
        report.add_error(format!(
            "Unbalanced braces: {} opening vs {} closing.",
            opening, closing
        ));
    }

    for block in MANDATORY_BLOCKS {
        let present = msg
            .blocks
            .get(&block)
            .map(|content| !content.trim().is_empty())
            .unwrap_or(false);
        if !present {
            report.add_error(format!("Mandatory block {} is missing or empty.", block));
        }
    }

    for tag in MANDATORY_TAGS {
        if is_blank(msg.field(tag)) {
            report.add_error(format!("Mandatory field {} is missing or blank.", tag));
        }
    }

    let has_ordering_customer =
        !is_blank(msg.field(FieldTag::Tag50A)) || !is_blank(msg.field(FieldTag::Tag50K));
    if !has_ordering_customer {
        report.add_error("One of fields 50A or 50K must be present.");
    }

    if let Some(value) = msg.field(FieldTag::Tag32A) {
        let value = value.trim();
        if !value.is_empty() && value.chars().count() < 9 {
            report.add_error(format!(
                "Field 32A is too short: expected date(6) + currency(3) + amount, got '{}'.",
                value
            ));
        }
    }

    if let Some(value) = msg.field(FieldTag::Tag71A) {
        if !value.trim().is_empty() {
            let normalized = normalize_code(value);
            if !CHARGE_CODES.contains(&normalized.as_str()) {
                report.add_error(format!(
                    "Field 71A must be one of OUR, BEN, SHA (got '{}').",
                    value.trim()
                ));
            }
        }
    }

    if let Some(value) = msg.field(FieldTag::Tag23B) {
        if !value.trim().is_empty() {
            let normalized = normalize_code(value);
            if !OPERATION_CODES.contains(&normalized.as_str()) {
                report.add_warning(format!(
                    "Field 23B value '{}' is outside the recommended set (CRED, SPAY, PHON, HOLD).",
                    value.trim()
                ));
            }
        }
    }

    report
}

/// Strip whitespace and non-letters, uppercase the rest.
fn normalize_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

// ---------------------------------------------------------------------------
// pacs.008 schema-style validation
// ---------------------------------------------------------------------------

/// Pattern categories recognized by the constraint table, each with its own
/// user-facing hint.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// ISO 4217 currency code: exactly 3 uppercase letters.
    Currency,
    /// BIC: 8 or 11 characters, e.g. BANKDEFAXXX.
    Bic,
    /// Decimal amount with a dot separator.
    Amount,
    /// IBAN-style account identifier.
    Iban,
}

impl Pattern {
    fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Pattern::Currency => {
                value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase())
            }
            Pattern::Bic => {
                (value.len() == 8 || value.len() == 11)
                    && value.chars().all(|c| c.is_ascii_alphanumeric())
                    && value.chars().take(6).all(|c| c.is_ascii_uppercase())
            }
            Pattern::Amount => {
                !value.is_empty()
                    && value.chars().all(|c| c.is_ascii_digit() || c == '.')
                    && value.chars().filter(|c| *c == '.').count() <= 1
            }
            Pattern::Iban => {
                value.len() >= 5
                    && value.len() <= 34
                    && value.chars().all(|c| c.is_ascii_alphanumeric())
            }
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Pattern::Currency => "an ISO 4217 currency code (3 uppercase letters)",
            Pattern::Bic => "a BIC (8 or 11 alphanumeric characters, e.g. BANKDEFAXXX)",
            Pattern::Amount => "a decimal amount with a dot separator (e.g. 1234.56)",
            Pattern::Iban => "an IBAN-style identifier (5 to 34 alphanumeric characters)",
        }
    }
}

/// Friendly message templates, one per violation category.
mod template {
    pub fn too_long(field: &str, value: &str, max: usize) -> String {
        let len = value.chars().count();
        format!(
            "Field {} is too long: '{}' has {} characters, maximum is {}. Remove {} character(s).",
            field,
            value,
            len,
            max,
            len.saturating_sub(max)
        )
    }

    pub fn too_short(field: &str, value: &str, min: usize) -> String {
        format!(
            "Field {} is too short: '{}' has {} characters, minimum is {}.",
            field,
            value,
            value.chars().count(),
            min
        )
    }

    pub fn pattern(field: &str, value: &str, hint: &str) -> String {
        format!("Field {} value '{}' is not {}.", field, value, hint)
    }

    pub fn enumeration(field: &str, value: &str, allowed: &[&str]) -> String {
        format!(
            "Field {} value '{}' is not allowed. Allowed values: {}.",
            field,
            value,
            allowed.join(", ")
        )
    }

    pub fn missing(field: &str) -> String {
        format!("Required element {} is missing.", field)
    }

    pub fn datatype(field: &str, value: &str, expected: &str) -> String {
        format!("Field {} value '{}' is not a valid {}.", field, value, expected)
    }
}

/// Validate pacs.008 XML text against the supported schema subset.
///
/// The constraint table below stands in for the compiled XSD; it is static
/// data, shared read-only across calls.
pub fn validate_pacs008(xml: &str) -> ValidationReport {
    let mut report = ValidationReport::new();

    let document = match Pacs008Document::parse(xml) {
        Ok(doc) => doc,
        Err(err) => {
            report.add_error(friendly_xml_error(&err.to_string()));
            return report;
        }
    };

    if document.xmlns != PACS008_NAMESPACE {
        report.add_error(format!(
            "Document namespace must be {} (got '{}').",
            PACS008_NAMESPACE, document.xmlns
        ));
    }

    let grp_hdr = &document.fi_to_fi.grp_hdr;
    check_text(&mut report, "MsgId", &grp_hdr.msg_id, 1, 35);
    match grp_hdr.cre_dt_tm.as_deref() {
        Some(value) => {
            if crate::pacs008_format::parse_iso_date(value).is_err() {
                report.add_error(template::datatype("CreDtTm", value, "ISO date-time"));
            }
        }
        None => report.add_error(template::missing("CreDtTm")),
    }
    match grp_hdr.nb_of_txs.as_deref() {
        Some(value) => {
            if value.parse::<u64>().is_err() {
                report.add_error(template::datatype("NbOfTxs", value, "number"));
            }
        }
        None => report.add_error(template::missing("NbOfTxs")),
    }
    if let Some(sttlm) = grp_hdr.sttlm_inf.as_ref() {
        check_enum(
            &mut report,
            "SttlmMtd",
            &sttlm.sttlm_mtd,
            &["INDA", "INGA", "COVE", "CLRG"],
        );
    }

    match document.fi_to_fi.cdt_trf_tx_inf.as_ref() {
        Some(tx) => validate_transaction(&mut report, tx),
        None => report.add_error(template::missing("CdtTrfTxInf")),
    }

    report
}

fn validate_transaction(report: &mut ValidationReport, tx: &CreditTransferTransactionXml) {
    if let Some(id) = tx.pmt_id.instr_id.as_deref() {
        check_text(report, "InstrId", id, 1, 35);
    }
    if let Some(id) = tx.pmt_id.end_to_end_id.as_deref() {
        check_text(report, "EndToEndId", id, 1, 35);
    }
    if tx.pmt_id.instr_id.is_none() && tx.pmt_id.end_to_end_id.is_none() {
        report.add_error(template::missing("PmtId/EndToEndId"));
    }

    if let Some(svc) = tx.pmt_tp_inf.as_ref().and_then(|p| p.svc_lvl.as_ref()) {
        check_text(report, "SvcLvl/Cd", &svc.cd, 1, 4);
    }

    match tx.intr_bk_sttlm_amt.as_ref() {
        Some(amt) => {
            if !Pattern::Amount.matches(&amt.value) {
                report.add_error(template::pattern(
                    "IntrBkSttlmAmt",
                    &amt.value,
                    Pattern::Amount.hint(),
                ));
            }
            match amt.ccy.as_deref() {
                Some(ccy) => {
                    if !Pattern::Currency.matches(ccy) {
                        report.add_error(template::pattern(
                            "IntrBkSttlmAmt/@Ccy",
                            ccy,
                            Pattern::Currency.hint(),
                        ));
                    }
                }
                None => report.add_error(template::missing("IntrBkSttlmAmt/@Ccy")),
            }
        }
        None => report.add_error(template::missing("IntrBkSttlmAmt")),
    }

    if let Some(date) = tx.intr_bk_sttlm_dt.as_deref() {
        if crate::pacs008_format::parse_iso_date(date).is_err() {
            report.add_error(template::datatype("IntrBkSttlmDt", date, "ISO date"));
        }
    }

    match tx.chrg_br.as_deref() {
        Some(code) => check_enum(report, "ChrgBr", code, &["DEBT", "CRED", "SHAR", "SLEV"]),
        None => report.add_error(template::missing("ChrgBr")),
    }

    for (field, agent) in [
        ("InstgAgt/BICFI", tx.instg_agt.as_ref()),
        ("InstdAgt/BICFI", tx.instd_agt.as_ref()),
        ("DbtrAgt/BICFI", tx.dbtr_agt.as_ref()),
        ("CdtrAgt/BICFI", tx.cdtr_agt.as_ref()),
    ] {
        if let Some(bic) = agent.and_then(|a| a.fin_instn_id.bicfi.as_deref()) {
            if !Pattern::Bic.matches(bic) {
                report.add_error(template::pattern(field, bic, Pattern::Bic.hint()));
            }
        }
    }

    for (name_field, adr_field, party) in [
        ("Dbtr/Nm", "Dbtr/AdrLine", tx.dbtr.as_ref()),
        ("Cdtr/Nm", "Cdtr/AdrLine", tx.cdtr.as_ref()),
    ] {
        match party {
            Some(p) => {
                if let Some(name) = p.nm.as_deref() {
                    check_text(report, name_field, name, 1, 140);
                }
                for line in p
                    .pstl_adr
                    .as_ref()
                    .map(|a| a.adr_line.as_slice())
                    .unwrap_or_default()
                {
                    check_text(report, adr_field, line, 1, 70);
                }
            }
            None => {
                let element = name_field.split('/').next().unwrap_or(name_field);
                report.add_error(template::missing(element));
            }
        }
    }

    for (iban_field, othr_field, acct) in [
        ("DbtrAcct/Id/IBAN", "DbtrAcct/Id/Othr/Id", tx.dbtr_acct.as_ref()),
        ("CdtrAcct/Id/IBAN", "CdtrAcct/Id/Othr/Id", tx.cdtr_acct.as_ref()),
    ] {
        if let Some(iban) = acct.and_then(|a| a.id.iban.as_deref()) {
            if !Pattern::Iban.matches(iban) {
                report.add_error(template::pattern(iban_field, iban, Pattern::Iban.hint()));
            }
        }
        if let Some(id) = acct.and_then(|a| a.id.othr.as_ref()) {
            check_text(report, othr_field, &id.id, 1, 34);
        }
    }

    if let Some(ustrd) = tx.rmt_inf.as_ref().and_then(|r| r.ustrd.as_deref()) {
        check_text(report, "RmtInf/Ustrd", ustrd, 1, 140);
    }
}

fn check_text(report: &mut ValidationReport, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len > max {
        report.add_error(template::too_long(field, value, max));
    } else if len < min {
        report.add_error(template::too_short(field, value, min));
    }
}

fn check_enum(report: &mut ValidationReport, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value.trim()) {
        report.add_error(template::enumeration(field, value, allowed));
    }
}

/// Translate a raw XML-library error into a user-facing message.
///
/// Best-effort pattern matching on the error text; anything unrecognized
/// falls back to a lightly cleaned version of the raw message.
fn friendly_xml_error(raw: &str) -> String {
    if let Some(rest) = raw.split("missing field `").nth(1) {
        if let Some(field) = rest.split('`').next() {
            return template::missing(field);
        }
    }
    if raw.contains("duplicate field") {
        return format!("Invalid pacs.008 XML: an element appears more than once ({}).", raw);
    }
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("Invalid pacs.008 XML: {}", cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mt103_format::Mt103Message;
    use pretty_assertions::assert_eq;

    const VALID_MT103: &str = "{1:F01BANKDEFAXXX0000000000}{2:O103250714BANKDEFAXXXBANKFRPPXXX0000000000}{4:\n:20:REF1\n:23B:CRED\n:32A:240714EUR1000,00\n:33B:EUR1000,00\n:50K:/123\nALICE\n:59:/456\nBOB\n:70:Invoice\n:71A:SHA\n-}{5:{CHK:000000000000}}";

    fn report_for(raw: &str) -> ValidationReport {
        validate_mt103(&Mt103Message::parse(raw))
    }

    #[test]
    fn test_valid_message_passes() {
        let report = report_for(VALID_MT103);
        assert_eq!(report.errors, Vec::<String>::new());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_mandatory_tag_named() {
        let without_71a = VALID_MT103.replace(":71A:SHA\n", "");
        let report = report_for(&without_71a);
        assert!(report.errors.iter().any(|e| e.contains("71A")));
    }

    #[test]
    fn test_invalid_charge_code_cites_allowed_set() {
        let bad = VALID_MT103.replace(":71A:SHA", ":71A:XYZ");
        let report = report_for(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("71A") && e.contains("OUR, BEN, SHA")));
    }

    #[test]
    fn test_charge_code_normalization_accepts_noise() {
        let noisy = VALID_MT103.replace(":71A:SHA", ":71A: sh a ");
        let report = report_for(&noisy);
        assert!(report.is_ok());
    }

    #[test]
    fn test_unrecognized_operation_code_is_warning_only() {
        let odd = VALID_MT103.replace(":23B:CRED", ":23B:ZZZZ");
        let report = report_for(&odd);
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("23B")));
    }

    #[test]
    fn test_missing_blocks_reported() {
        let report = report_for(":20:REF1\n:23B:CRED\n:32A:240714EUR1000,00\n:33B:EUR1000,00\n:50K:ALICE\n:59:BOB\n:70:X\n:71A:SHA\n");
        assert!(report.errors.iter().any(|e| e.contains("block 1")));
        assert!(report.errors.iter().any(|e| e.contains("block 5")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("start with '{'")));
    }

    #[test]
    fn test_unbalanced_braces_reported() {
        let report = report_for("{1:ABC}{2:DEF}{4:\n:20:R\n-}{5:{CHK:0}");
        assert!(report.errors.iter().any(|e| e.contains("Unbalanced braces")));
    }

    #[test]
    fn test_short_32a_reported() {
        let short = VALID_MT103.replace(":32A:240714EUR1000,00", ":32A:240714EU");
        let report = report_for(&short);
        assert!(report.errors.iter().any(|e| e.contains("32A") && e.contains("too short")));
    }

    #[test]
    fn test_all_failures_collected() {
        let report = report_for("plain text, not a swift message");
        // Structural, block, and field failures all show up together.
        assert!(report.errors.len() >= 10);
    }

    const VALID_PACS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08">
  <FIToFICstmrCdtTrf>
    <GrpHdr>
      <MsgId>MSG123</MsgId>
      <CreDtTm>2025-07-14T10:15:30</CreDtTm>
      <NbOfTxs>1</NbOfTxs>
      <SttlmInf><SttlmMtd>CLRG</SttlmMtd></SttlmInf>
    </GrpHdr>
    <CdtTrfTxInf>
      <PmtId><InstrId>INSTR-1</InstrId><EndToEndId>E2E-1</EndToEndId></PmtId>
      <PmtTpInf><SvcLvl><Cd>NORM</Cd></SvcLvl></PmtTpInf>
      <IntrBkSttlmAmt Ccy="EUR">1234.56</IntrBkSttlmAmt>
      <IntrBkSttlmDt>2025-07-14</IntrBkSttlmDt>
      <ChrgBr>SHAR</ChrgBr>
      <Dbtr><Nm>ALPHA COMPANY</Nm></Dbtr>
      <Cdtr><Nm>BETA SARL</Nm></Cdtr>
    </CdtTrfTxInf>
  </FIToFICstmrCdtTrf>
</Document>"#;

    #[test]
    fn test_valid_pacs_passes() {
        let report = validate_pacs008(VALID_PACS);
        assert_eq!(report.errors, Vec::<String>::new());
    }

    #[test]
    fn test_missing_transaction_element() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08">
  <FIToFICstmrCdtTrf>
    <GrpHdr><MsgId>M</MsgId><CreDtTm>2025-07-14</CreDtTm><NbOfTxs>1</NbOfTxs></GrpHdr>
  </FIToFICstmrCdtTrf>
</Document>"#;
        let report = validate_pacs008(xml);
        assert!(report.errors.iter().any(|e| e.contains("CdtTrfTxInf")));
    }

    #[test]
    fn test_enumeration_violation() {
        let bad = VALID_PACS.replace("<ChrgBr>SHAR</ChrgBr>", "<ChrgBr>WXYZ</ChrgBr>");
        let report = validate_pacs008(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("ChrgBr") && e.contains("DEBT, CRED, SHAR, SLEV")));
    }

    #[test]
    fn test_max_length_violation_suggests_trim() {
        let long_name = "X".repeat(150);
        let bad = VALID_PACS.replace("ALPHA COMPANY", &long_name);
        let report = validate_pacs008(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Dbtr/Nm") && e.contains("Remove 10 character(s)")));
    }

    #[test]
    fn test_pattern_violation_currency() {
        let bad = VALID_PACS.replace("Ccy=\"EUR\"", "Ccy=\"eu\"");
        let report = validate_pacs008(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("@Ccy") && e.contains("ISO 4217")));
    }

    #[test]
    fn test_pattern_violation_amount() {
        let bad = VALID_PACS.replace(">1234.56<", ">12,34<");
        let report = validate_pacs008(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("IntrBkSttlmAmt") && e.contains("decimal amount")));
    }

    #[test]
    fn test_pattern_violation_iban() {
        let bad = VALID_PACS.replace(
            "<Dbtr><Nm>ALPHA COMPANY</Nm></Dbtr>",
            "<Dbtr><Nm>ALPHA COMPANY</Nm></Dbtr><DbtrAcct><Id><IBAN>FR!!</IBAN></Id></DbtrAcct>",
        );
        let report = validate_pacs008(&bad);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("IBAN") && e.contains("IBAN-style")));
    }

    #[test]
    fn test_unparseable_xml_gets_friendly_fallback() {
        let report = validate_pacs008("<Document><broken");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Invalid pacs.008 XML:"));
    }

    #[test]
    fn test_wrong_namespace_reported() {
        let bad = VALID_PACS.replace("pacs.008.001.08", "pacs.008.001.02");
        let report = validate_pacs008(&bad);
        assert!(report.errors.iter().any(|e| e.contains("namespace")));
    }
}
