//! pacs.008 (ISO 20022) format parser and serializer.
//!
//! pacs.008 is the XML FI-to-FI customer credit transfer message. The
//! element tree below mirrors the pacs.008.001.08 schema subset this
//! converter emits; struct field order is the schema's element order and
//! must not be rearranged.

use crate::error::{Error, Result};
use crate::types::{
    format_iso_amount, service_level_from_iso, service_level_to_iso, BankDirectory, ChargeBearer,
    MappedTransaction, Party,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Namespace of the supported pacs.008 schema version.
pub const PACS008_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08";

/// A parsed or constructed pacs.008 document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Document")]
pub struct Pacs008Document {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "FIToFICstmrCdtTrf")]
    pub fi_to_fi: FiToFiCustomerCreditTransferXml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiToFiCustomerCreditTransferXml {
    #[serde(rename = "GrpHdr")]
    pub grp_hdr: GroupHeaderXml,
    #[serde(rename = "CdtTrfTxInf", skip_serializing_if = "Option::is_none")]
    pub cdt_trf_tx_inf: Option<CreditTransferTransactionXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHeaderXml {
    #[serde(rename = "MsgId")]
    pub msg_id: String,
    #[serde(rename = "CreDtTm", skip_serializing_if = "Option::is_none")]
    pub cre_dt_tm: Option<String>,
    #[serde(rename = "NbOfTxs", skip_serializing_if = "Option::is_none")]
    pub nb_of_txs: Option<String>,
    #[serde(rename = "SttlmInf", skip_serializing_if = "Option::is_none")]
    pub sttlm_inf: Option<SettlementInstructionXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementInstructionXml {
    #[serde(rename = "SttlmMtd")]
    pub sttlm_mtd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransferTransactionXml {
    #[serde(rename = "PmtId")]
    pub pmt_id: PaymentIdXml,
    #[serde(rename = "PmtTpInf", skip_serializing_if = "Option::is_none")]
    pub pmt_tp_inf: Option<PaymentTypeInformationXml>,
    #[serde(rename = "IntrBkSttlmAmt", skip_serializing_if = "Option::is_none")]
    pub intr_bk_sttlm_amt: Option<CurrencyAmountXml>,
    #[serde(rename = "IntrBkSttlmDt", skip_serializing_if = "Option::is_none")]
    pub intr_bk_sttlm_dt: Option<String>,
    #[serde(rename = "ChrgBr", skip_serializing_if = "Option::is_none")]
    pub chrg_br: Option<String>,
    #[serde(rename = "InstgAgt", skip_serializing_if = "Option::is_none")]
    pub instg_agt: Option<AgentXml>,
    #[serde(rename = "InstdAgt", skip_serializing_if = "Option::is_none")]
    pub instd_agt: Option<AgentXml>,
    #[serde(rename = "Dbtr", skip_serializing_if = "Option::is_none")]
    pub dbtr: Option<PartyXml>,
    #[serde(rename = "DbtrAcct", skip_serializing_if = "Option::is_none")]
    pub dbtr_acct: Option<AccountXml>,
    #[serde(rename = "DbtrAgt", skip_serializing_if = "Option::is_none")]
    pub dbtr_agt: Option<AgentXml>,
    #[serde(rename = "CdtrAgt", skip_serializing_if = "Option::is_none")]
    pub cdtr_agt: Option<AgentXml>,
    #[serde(rename = "Cdtr", skip_serializing_if = "Option::is_none")]
    pub cdtr: Option<PartyXml>,
    #[serde(rename = "CdtrAcct", skip_serializing_if = "Option::is_none")]
    pub cdtr_acct: Option<AccountXml>,
    #[serde(rename = "RmtInf", skip_serializing_if = "Option::is_none")]
    pub rmt_inf: Option<RemittanceInformationXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIdXml {
    #[serde(rename = "InstrId", skip_serializing_if = "Option::is_none")]
    pub instr_id: Option<String>,
    #[serde(rename = "EndToEndId", skip_serializing_if = "Option::is_none")]
    pub end_to_end_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTypeInformationXml {
    #[serde(rename = "SvcLvl", skip_serializing_if = "Option::is_none")]
    pub svc_lvl: Option<ServiceLevelXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLevelXml {
    #[serde(rename = "Cd")]
    pub cd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmountXml {
    #[serde(rename = "@Ccy", skip_serializing_if = "Option::is_none")]
    pub ccy: Option<String>,
    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentXml {
    #[serde(rename = "FinInstnId")]
    pub fin_instn_id: FinancialInstitutionIdXml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInstitutionIdXml {
    #[serde(rename = "BICFI", skip_serializing_if = "Option::is_none")]
    pub bicfi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyXml {
    #[serde(rename = "Nm", skip_serializing_if = "Option::is_none")]
    pub nm: Option<String>,
    #[serde(rename = "PstlAdr", skip_serializing_if = "Option::is_none")]
    pub pstl_adr: Option<PostalAddressXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalAddressXml {
    #[serde(rename = "AdrLine", default, skip_serializing_if = "Vec::is_empty")]
    pub adr_line: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountXml {
    #[serde(rename = "Id")]
    pub id: AccountIdXml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountIdXml {
    #[serde(rename = "IBAN", skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(rename = "Othr", skip_serializing_if = "Option::is_none")]
    pub othr: Option<OtherAccountIdXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherAccountIdXml {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceInformationXml {
    #[serde(rename = "Ustrd", skip_serializing_if = "Option::is_none")]
    pub ustrd: Option<String>,
}

impl Pacs008Document {
    /// Parse a pacs.008 document from XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Serialize to XML text with a declaration. Element order follows the
    /// struct definitions, which reproduce the schema's fixed order.
    pub fn to_xml_string(&self) -> Result<String> {
        let body = quick_xml::se::to_string(self).map_err(|e| Error::Xml(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", body))
    }

    /// Build a pacs.008 document from a mapped transaction.
    ///
    /// The group header (message id, creation time, transaction count,
    /// clearing settlement method) and the agent BICs are not derived from
    /// the MT103 input; the source message carries no routing detail, so
    /// placeholder values from the directory are emitted unconditionally.
    pub fn from_transaction(tx: &MappedTransaction, directory: &BankDirectory) -> Self {
        let now = Utc::now();
        // An account-only MT party has no name; omit Nm rather than emit an
        // empty element the length checks would reject.
        let party = |p: &Party| PartyXml {
            nm: if p.name.trim().is_empty() {
                None
            } else {
                Some(p.name.clone())
            },
            pstl_adr: if p.address_lines.is_empty() {
                None
            } else {
                Some(PostalAddressXml {
                    adr_line: p.address_lines.clone(),
                })
            },
        };
        let account = |p: &Party| {
            p.account.as_ref().map(|id| AccountXml {
                id: AccountIdXml {
                    iban: None,
                    othr: Some(OtherAccountIdXml { id: id.clone() }),
                },
            })
        };
        let agent = |bic: &str| AgentXml {
            fin_instn_id: FinancialInstitutionIdXml {
                bicfi: Some(bic.to_string()),
            },
        };

        Pacs008Document {
            xmlns: PACS008_NAMESPACE.to_string(),
            fi_to_fi: FiToFiCustomerCreditTransferXml {
                grp_hdr: GroupHeaderXml {
                    msg_id: format!("MSG{}", now.timestamp_millis()),
                    cre_dt_tm: Some(now.format("%Y-%m-%dT%H:%M:%S").to_string()),
                    nb_of_txs: Some("1".to_string()),
                    sttlm_inf: Some(SettlementInstructionXml {
                        sttlm_mtd: "CLRG".to_string(),
                    }),
                },
                cdt_trf_tx_inf: Some(CreditTransferTransactionXml {
                    pmt_id: PaymentIdXml {
                        instr_id: Some(tx.reference.clone()),
                        end_to_end_id: Some(tx.reference.clone()),
                    },
                    pmt_tp_inf: Some(PaymentTypeInformationXml {
                        svc_lvl: Some(ServiceLevelXml {
                            cd: service_level_to_iso(&tx.service_level).to_string(),
                        }),
                    }),
                    intr_bk_sttlm_amt: Some(CurrencyAmountXml {
                        ccy: Some(tx.currency.clone()),
                        value: format_iso_amount(&tx.amount),
                    }),
                    intr_bk_sttlm_dt: Some(tx.settlement_date.format("%Y-%m-%d").to_string()),
                    chrg_br: Some(tx.charge_bearer.iso_code().to_string()),
                    instg_agt: Some(agent(&directory.sender_bic)),
                    instd_agt: Some(agent(&directory.receiver_bic)),
                    dbtr: Some(party(&tx.debtor)),
                    dbtr_acct: account(&tx.debtor),
                    dbtr_agt: Some(agent(&directory.debtor_agent_bic)),
                    cdtr_agt: Some(agent(&directory.creditor_agent_bic)),
                    cdtr: Some(party(&tx.creditor)),
                    cdtr_acct: account(&tx.creditor),
                    rmt_inf: tx.remittance.as_ref().and_then(|r| {
                        if r.trim().is_empty() {
                            None
                        } else {
                            Some(RemittanceInformationXml {
                                ustrd: Some(r.clone()),
                            })
                        }
                    }),
                }),
            },
        }
    }

    /// Extract a mapped transaction from the document.
    ///
    /// `CdtTrfTxInf` is required; everything else degrades gracefully the
    /// way the upstream converter did (reference falls back to EndToEndId
    /// then a generated one, settlement date falls back to the group header
    /// creation timestamp, missing amount becomes zero).
    pub fn to_transaction(&self) -> Result<MappedTransaction> {
        let tx = self
            .fi_to_fi
            .cdt_trf_tx_inf
            .as_ref()
            .ok_or_else(|| Error::MissingField("CdtTrfTxInf".to_string()))?;

        let reference = tx
            .pmt_id
            .instr_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                tx.pmt_id
                    .end_to_end_id
                    .clone()
                    .filter(|s| !s.trim().is_empty())
            })
            .unwrap_or_else(|| format!("REF{}", Utc::now().timestamp_millis()));

        let (amount, currency) = match tx.intr_bk_sttlm_amt.as_ref() {
            Some(amt) => {
                let value = Decimal::from_str(amt.value.trim())
                    .map_err(|_| Error::InvalidAmount(amt.value.clone()))?;
                let ccy = amt
                    .ccy
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "EUR".to_string());
                (value, ccy)
            }
            None => (Decimal::ZERO, "EUR".to_string()),
        };

        let settlement_date = tx
            .intr_bk_sttlm_dt
            .as_deref()
            .and_then(|d| parse_iso_date(d).ok())
            .or_else(|| {
                self.fi_to_fi
                    .grp_hdr
                    .cre_dt_tm
                    .as_deref()
                    .and_then(|d| parse_iso_date(d).ok())
            })
            .unwrap_or_else(|| Utc::now().date_naive());

        let service_level = tx
            .pmt_tp_inf
            .as_ref()
            .and_then(|p| p.svc_lvl.as_ref())
            .map(|s| service_level_from_iso(&s.cd))
            .unwrap_or("CRED")
            .to_string();

        let charge_bearer = tx
            .chrg_br
            .as_deref()
            .map(ChargeBearer::from_iso_code)
            .unwrap_or(ChargeBearer::Sha);

        let extract_party = |party: Option<&PartyXml>, acct: Option<&AccountXml>| Party {
            name: party
                .and_then(|p| p.nm.clone())
                .unwrap_or_default(),
            address_lines: party
                .and_then(|p| p.pstl_adr.as_ref())
                .map(|a| a.adr_line.clone())
                .unwrap_or_default(),
            account: acct.and_then(|a| {
                a.id.iban
                    .clone()
                    .or_else(|| a.id.othr.as_ref().map(|o| o.id.clone()))
            }),
        };

        Ok(MappedTransaction {
            reference,
            service_level,
            settlement_date,
            currency,
            amount,
            charge_bearer,
            debtor: extract_party(tx.dbtr.as_ref(), tx.dbtr_acct.as_ref()),
            creditor: extract_party(tx.cdtr.as_ref(), tx.cdtr_acct.as_ref()),
            remittance: tx
                .rmt_inf
                .as_ref()
                .and_then(|r| r.ustrd.clone())
                .filter(|u| !u.trim().is_empty()),
        })
    }
}

/// Parse an ISO date, with or without a time component, e.g. `2025-07-14`
/// or `2025-07-14T10:15:30`.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    let date_part = value.split('T').next().unwrap_or(value).trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(value.to_string()))
}
