//! ads.txt record types.
//!
//! The parser produces [`ParsedAdsTxtEntry`] and [`VariableEntry`] values;
//! the classifier wraps entries into [`ClassifiedRecord`]s consumed once by
//! the content assembler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relationship declared in the third field of an ads.txt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relationship {
    Direct,
    Reseller,
}

impl Relationship {
    /// Sort rank: DIRECT sorts before RESELLER within a category.
    pub fn rank(self) -> u8 {
        match self {
            Relationship::Direct => 0,
            Relationship::Reseller => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Direct => "DIRECT",
            Relationship::Reseller => "RESELLER",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT" => Ok(Relationship::Direct),
            "RESELLER" => Ok(Relationship::Reseller),
            _ => Err(()),
        }
    }
}

/// Severity attached to a failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One data line of an ads.txt file, as produced by the parser.
///
/// Invalid lines are carried through with `is_valid = false` and a
/// `validation_key` naming the failed rule; they are excluded from
/// classification upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAdsTxtEntry {
    /// Advertising system domain (first field), lowercased.
    pub domain: String,
    /// Publisher account id within the advertising system (second field).
    pub account_id: String,
    /// Raw third field as written in the file.
    pub account_type: String,
    /// Parsed relationship; `Direct` for unparseable third fields on
    /// invalid entries.
    pub relationship: Relationship,
    /// Optional certification authority id (fourth field).
    pub certification_authority_id: Option<String>,
    pub is_valid: bool,
    /// Key of the validation rule that failed, when `is_valid` is false.
    pub validation_key: Option<String>,
    pub severity: Option<Severity>,
}

/// A `key=value` variable declaration line (CONTACT, SUBDOMAIN, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Variable type, uppercased (e.g. "CONTACT").
    pub variable_type: String,
    pub value: String,
}

/// Category assigned to a valid record by the classifier.
///
/// Categories are mutually exclusive and exhaustive over the valid-record
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordCategory {
    /// Confirmed against the advertising system's sellers.json.
    Other,
    /// Matching seller exists but is marked confidential.
    Confidential,
    /// sellers.json exists but has no seller for this account id.
    MissingSellerId,
    /// No sellers.json data is available for the domain.
    NoSellerJson,
}

/// A parsed entry plus its classification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub entry: ParsedAdsTxtEntry,
    pub category: RecordCategory,
    /// Certification authority id after back-fill from sibling entries or
    /// from the sellers.json identifiers list.
    pub certification_authority_id: Option<String>,
}

impl ClassifiedRecord {
    /// Render the record as an output ads.txt line.
    pub fn to_line(&self) -> String {
        match &self.certification_authority_id {
            Some(cert) => format!(
                "{}, {}, {}, {}",
                self.entry.domain, self.entry.account_id, self.entry.relationship, cert
            ),
            None => format!("{}, {}, {}", self.entry.domain, self.entry.account_id, self.entry.relationship),
        }
    }
}
