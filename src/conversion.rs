//! Forward (MT103 → pacs.008) and reverse (pacs.008 → MT103) pipelines.
//!
//! Both conversions are stateless, synchronous calls: tokenize, validate,
//! map, render, and (forward) re-validate the rendered XML. All validation
//! failures from a stage are returned together; a failed stage prevents the
//! next one from running, and nothing partial is ever returned.

use crate::error::{Error, Result};
use crate::mt103_format::{parse_party_field, render_mt103, Mt103Message};
use crate::pacs008_format::Pacs008Document;
use crate::types::{
    parse_mt_amount, BankDirectory, ChargeBearer, FieldTag, MappedTransaction, TaggedFieldSet,
};
use crate::validation::{validate_mt103, validate_pacs008};
use chrono::Utc;

/// Result of a forward conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    /// True when a schema-valid pacs.008 document was produced.
    pub success: bool,

    /// The generated XML; `None` on any failure, including schema failures
    /// after an XML was produced internally.
    pub xml: Option<String>,

    /// Ordered human-readable error messages; empty on success.
    pub errors: Vec<String>,
}

/// Result of a reverse conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseOutcome {
    /// True when an MT103 message was produced.
    pub success: bool,

    /// The generated MT103 text; `None` on any failure.
    pub mt103: Option<String>,

    /// Ordered human-readable error messages; empty on success.
    pub errors: Vec<String>,
}

/// Convert a raw MT103 message to pacs.008 XML.
pub fn convert_forward(raw: &str) -> ForwardOutcome {
    let fail = |errors: Vec<String>| {
        tracing::warn!(count = errors.len(), "MT103 conversion failed");
        ForwardOutcome {
            success: false,
            xml: None,
            errors,
        }
    };

    if raw.trim().is_empty() {
        return fail(vec!["The MT103 message is empty.".to_string()]);
    }

    let message = Mt103Message::parse(raw);

    let report = validate_mt103(&message);
    for warning in &report.warnings {
        tracing::warn!(warning = %warning, "MT103 validation warning");
    }
    if !report.is_ok() {
        return fail(report.errors);
    }

    let transaction = match map_forward(&message.fields) {
        Ok(tx) => tx,
        Err(err) => {
            return fail(vec![format!(
                "Error transforming the MT103 message: {}",
                err
            )])
        }
    };

    let document = Pacs008Document::from_transaction(&transaction, &BankDirectory::default());
    let xml = match document.to_xml_string() {
        Ok(xml) => xml,
        Err(err) => return fail(vec![format!("Error rendering pacs.008 XML: {}", err)]),
    };

    // The generated XML is discarded when it fails the schema checks; it is
    // never returned to the caller alongside errors.
    let schema_report = validate_pacs008(&xml);
    if !schema_report.is_ok() {
        return fail(schema_report.errors);
    }

    tracing::info!(reference = %transaction.reference, "MT103 converted to pacs.008");
    ForwardOutcome {
        success: true,
        xml: Some(xml),
        errors: Vec::new(),
    }
}

/// Convert pacs.008 XML to an MT103 message.
pub fn convert_reverse(xml: &str) -> ReverseOutcome {
    let fail = |errors: Vec<String>| {
        tracing::warn!(count = errors.len(), "pacs.008 conversion failed");
        ReverseOutcome {
            success: false,
            mt103: None,
            errors,
        }
    };

    if xml.trim().is_empty() {
        return fail(vec!["The pacs.008 XML content is empty.".to_string()]);
    }

    let schema_report = validate_pacs008(xml);
    if !schema_report.is_ok() {
        return fail(schema_report.errors);
    }

    let result = Pacs008Document::parse(xml).and_then(|document| {
        let transaction = document.to_transaction()?;
        let mt103 = render_mt103(&transaction, &BankDirectory::default())?;
        Ok((transaction, mt103))
    });

    match result {
        Ok((transaction, mt103)) => {
            tracing::info!(reference = %transaction.reference, "pacs.008 converted to MT103");
            ReverseOutcome {
                success: true,
                mt103: Some(mt103),
                errors: Vec::new(),
            }
        }
        Err(err) => fail(vec![format!("Error parsing the pacs.008 XML: {}", err)]),
    }
}

/// Map validated MT103 fields onto the intermediate transaction.
///
/// The table is fixed: 20 → reference, 23B → service level, 32A →
/// currency/amount, 71A → charge bearer, 50K (or 50A) → debtor, 59 →
/// creditor, 70 → remittance. The 32A date characters are carried in the
/// message but not used for settlement; the settlement date is the current
/// date, matching upstream behavior.
pub fn map_forward(fields: &TaggedFieldSet) -> Result<MappedTransaction> {
    let reference = fields
        .get(&FieldTag::Tag20)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingField("20".to_string()))?;

    let service_level = fields
        .get(&FieldTag::Tag23B)
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "CRED".to_string());

    let field_32a = fields
        .get(&FieldTag::Tag32A)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingField("32A".to_string()))?;
    let currency = field_32a
        .get(6..9)
        .ok_or_else(|| Error::ParseError(format!("Field 32A too short: '{}'", field_32a)))?
        .to_uppercase();
    let amount_part = field_32a
        .get(9..)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidAmount(field_32a.to_string()))?;
    let amount = parse_mt_amount(amount_part)?.round_dp(2);

    let charge_bearer = fields
        .get(&FieldTag::Tag71A)
        .map(|v| ChargeBearer::from_mt_code(&letters_only(v)))
        .unwrap_or(ChargeBearer::Sha);

    let debtor_field = fields
        .get(&FieldTag::Tag50K)
        .or_else(|| fields.get(&FieldTag::Tag50A))
        .ok_or_else(|| Error::MissingField("50A/50K".to_string()))?;
    let debtor = parse_party_field(debtor_field);

    let creditor_field = fields
        .get(&FieldTag::Tag59)
        .ok_or_else(|| Error::MissingField("59".to_string()))?;
    let creditor = parse_party_field(creditor_field);

    let remittance = fields
        .get(&FieldTag::Tag70)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(MappedTransaction {
        reference,
        service_level,
        settlement_date: Utc::now().date_naive(),
        currency,
        amount,
        charge_bearer,
        debtor,
        creditor,
        remittance,
    })
}

fn letters_only(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::format_iso_amount;
    use pretty_assertions::assert_eq;

    const VALID_MT103: &str = "{1:F01BANKDEFAXXX0000000000}{2:O103250714BANKDEFAXXXBANKFRPPXXX0000000000}{4:\n:20:REF1\n:23B:CRED\n:32A:240714EUR1000,00\n:33B:EUR1000,00\n:50K:/123\nALICE\n:59:/456\nBOB\n:70:Invoice\n:71A:SHA\n-}{5:{CHK:000000000000}}";

    const VALID_PACS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08">
  <FIToFICstmrCdtTrf>
    <GrpHdr>
      <MsgId>MSG123</MsgId>
      <CreDtTm>2025-07-14T10:15:30</CreDtTm>
      <NbOfTxs>1</NbOfTxs>
    </GrpHdr>
    <CdtTrfTxInf>
      <PmtId><InstrId>INSTR-1</InstrId><EndToEndId>E2E-1</EndToEndId></PmtId>
      <PmtTpInf><SvcLvl><Cd>NORM</Cd></SvcLvl></PmtTpInf>
      <IntrBkSttlmAmt Ccy="EUR">1234.56</IntrBkSttlmAmt>
      <IntrBkSttlmDt>2025-07-14</IntrBkSttlmDt>
      <ChrgBr>SHAR</ChrgBr>
      <Dbtr>
        <Nm>ALPHA COMPANY</Nm>
        <PstlAdr><AdrLine>1 RUE A</AdrLine><AdrLine>75000 PARIS</AdrLine></PstlAdr>
      </Dbtr>
      <DbtrAcct><Id><Othr><Id>DEBTACC1</Id></Othr></Id></DbtrAcct>
      <Cdtr>
        <Nm>BETA SARL</Nm>
        <PstlAdr><AdrLine>2 AV B</AdrLine></PstlAdr>
      </Cdtr>
      <CdtrAcct><Id><Othr><Id>CREDACC9</Id></Othr></Id></CdtrAcct>
      <RmtInf><Ustrd>Facture 2025-07</Ustrd></RmtInf>
    </CdtTrfTxInf>
  </FIToFICstmrCdtTrf>
</Document>"#;

    #[test]
    fn test_forward_happy_path() {
        let outcome = convert_forward(VALID_MT103);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        let xml = outcome.xml.unwrap();
        assert!(xml.contains("<IntrBkSttlmAmt Ccy=\"EUR\">1000.00</IntrBkSttlmAmt>"));
        assert!(xml.contains("<ChrgBr>SHAR</ChrgBr>"));
        assert!(xml.contains("<InstrId>REF1</InstrId>"));
        assert!(xml.contains("<EndToEndId>REF1</EndToEndId>"));
        assert!(xml.contains("<Cd>NORM</Cd>"));
        assert!(xml.contains("<Nm>ALICE</Nm>"));
        assert!(xml.contains("<Id>123</Id>"));
        assert!(xml.contains("<Ustrd>Invoice</Ustrd>"));
        assert!(xml.contains("<NbOfTxs>1</NbOfTxs>"));
        assert!(xml.contains("<SttlmMtd>CLRG</SttlmMtd>"));
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_forward_missing_tag_names_it() {
        let without_71a = VALID_MT103.replace(":71A:SHA\n", "");
        let outcome = convert_forward(&without_71a);
        assert!(!outcome.success);
        assert!(outcome.xml.is_none());
        assert!(outcome.errors.iter().any(|e| e.contains("71A")));
    }

    #[test]
    fn test_forward_empty_input() {
        let outcome = convert_forward("   ");
        assert!(!outcome.success);
        assert!(outcome.errors[0].contains("empty"));
    }

    #[test]
    fn test_forward_invalid_charge_code() {
        let bad = VALID_MT103.replace(":71A:SHA", ":71A:ABC");
        let outcome = convert_forward(&bad);
        assert!(!outcome.success);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("71A") && e.contains("OUR, BEN, SHA")));
    }

    #[test]
    fn test_forward_amount_separator_conversion() {
        // Replaces both the 32A and 33B occurrences.
        let msg = VALID_MT103.replace("EUR1000,00", "EUR1234,56");
        let outcome = convert_forward(&msg);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        assert!(outcome.xml.unwrap().contains(">1234.56</IntrBkSttlmAmt>"));
    }

    #[test]
    fn test_forward_rounds_to_two_decimals() {
        let msg = VALID_MT103.replace("EUR1000,00", "EUR1000,005");
        let outcome = convert_forward(&msg);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        // Banker's rounding at 2 decimal places.
        assert!(outcome.xml.unwrap().contains(">1000.00</IntrBkSttlmAmt>"));
    }

    #[test]
    fn test_forward_service_level_mapping() {
        let urgent = VALID_MT103.replace(":23B:CRED", ":23B:CRTS");
        let outcome = convert_forward(&urgent);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        assert!(outcome.xml.unwrap().contains("<Cd>NURG</Cd>"));
    }

    #[test]
    fn test_map_forward_party_without_account() {
        let mut fields = TaggedFieldSet::new();
        fields.insert(FieldTag::Tag20, "R1".to_string());
        fields.insert(FieldTag::Tag32A, "240714EUR5,00".to_string());
        fields.insert(FieldTag::Tag50K, "ALICE SMITH\n1 MAIN ST".to_string());
        fields.insert(FieldTag::Tag59, "/456\nBOB".to_string());
        let tx = map_forward(&fields).unwrap();
        assert_eq!(tx.debtor.name, "ALICE SMITH");
        assert_eq!(tx.debtor.account, None);
        assert_eq!(tx.debtor.address_lines, vec!["1 MAIN ST"]);
        assert_eq!(tx.creditor.account.as_deref(), Some("456"));
        assert_eq!(format_iso_amount(&tx.amount), "5.00");
        assert_eq!(tx.currency, "EUR");
    }

    #[test]
    fn test_forward_account_only_debtor() {
        let msg = VALID_MT103.replace(":50K:/123\nALICE", ":50K:/123");
        let outcome = convert_forward(&msg);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        let xml = outcome.xml.unwrap();
        assert!(xml.contains("<Id>123</Id>"));
        assert!(!xml.contains("<Nm></Nm>"));
        assert!(!xml.contains("<Nm/>"));
    }

    #[test]
    fn test_reverse_happy_path() {
        let outcome = convert_reverse(VALID_PACS);
        assert!(outcome.success, "errors: {:?}", outcome.errors);
        let mt = outcome.mt103.unwrap();
        assert!(mt.contains(":20:INSTR-1"));
        assert!(mt.contains(":32A:250714EUR1234,56"));
        assert!(mt.contains(":33B:EUR1234,56"));
        assert!(mt.contains("/DEBTACC1"));
        assert!(mt.contains("ALPHA COMPANY"));
        assert!(mt.contains("/CREDACC9"));
        assert!(mt.contains(":70:Facture 2025-07"));
        assert!(mt.contains(":71A:SHA"));
        assert!(mt.contains(":23B:CRED"));
        assert!(mt.contains("{5:{CHK:000000000000}}"));
    }

    #[test]
    fn test_reverse_missing_transaction() {
        let xml = r#"<?xml version="1.0"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08">
  <FIToFICstmrCdtTrf>
    <GrpHdr><MsgId>MSG123</MsgId><CreDtTm>2025-07-14</CreDtTm><NbOfTxs>1</NbOfTxs></GrpHdr>
  </FIToFICstmrCdtTrf>
</Document>"#;
        let outcome = convert_reverse(xml);
        assert!(!outcome.success);
        assert!(outcome.mt103.is_none());
        assert!(outcome.errors.iter().any(|e| e.contains("CdtTrfTxInf")));
    }

    #[test]
    fn test_reverse_empty_input() {
        let outcome = convert_reverse("");
        assert!(!outcome.success);
        assert!(outcome.errors[0].contains("empty"));
    }

    #[test]
    fn test_reverse_malformed_xml_single_error() {
        let outcome = convert_reverse("<Document><not closed");
        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_amount_round_trip() {
        // Forward: comma to dot.
        let forward = convert_forward(VALID_MT103);
        assert!(forward.xml.unwrap().contains(">1000.00</IntrBkSttlmAmt>"));

        // Reverse: dot back to comma at exactly 2 decimals.
        let reverse = convert_reverse(VALID_PACS);
        assert!(reverse.mt103.unwrap().contains("EUR1234,56"));
    }

    #[test]
    fn test_full_round_trip_preserves_core_fields() {
        let forward = convert_forward(VALID_MT103);
        assert!(forward.success, "errors: {:?}", forward.errors);
        let reverse = convert_reverse(&forward.xml.unwrap());
        assert!(reverse.success, "errors: {:?}", reverse.errors);
        let mt = reverse.mt103.unwrap();
        assert!(mt.contains(":20:REF1"));
        assert!(mt.contains("EUR1000,00"));
        assert!(mt.contains("/123"));
        assert!(mt.contains("ALICE"));
        assert!(mt.contains(":71A:SHA"));
    }
}
