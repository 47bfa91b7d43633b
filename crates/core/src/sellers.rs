//! sellers.json document types.
//!
//! Real-world sellers.json files are loose with types: `is_confidential`
//! appears as both booleans and 0/1 integers, and numeric seller ids are
//! common. The deserializers here accept both forms so a single lenient
//! representation flows through the cache and classifier.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One entry of a sellers.json `identifiers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub value: String,
}

/// One entry of a sellers.json `sellers` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    #[serde(deserialize_with = "de_string_or_number")]
    pub seller_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub seller_type: Option<String>,
    #[serde(default, deserialize_with = "de_bool_or_int")]
    pub is_confidential: bool,
}

/// Document-level metadata, derivable without touching the seller array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellersJsonMetadata {
    pub seller_count: u64,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Aggregate counts over the seller array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub total_count: u64,
    pub confidential_count: u64,
}

impl SellersJsonMetadata {
    /// Find a TAG-ID style certification authority id in the identifiers
    /// list: the first identifier whose name contains "tag-id",
    /// case-insensitively.
    pub fn tag_id(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.name.to_ascii_lowercase().contains("tag-id"))
            .map(|id| id.value.as_str())
    }
}

/// Normalize a seller/account id for comparison: trimmed, lowercased.
pub fn normalize_seller_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Float(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Int(n) => Ok(n.to_string()),
        StringOrNumber::Float(n) => Ok(n.to_string()),
    }
}

fn de_bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    match BoolOrInt::deserialize(deserializer)? {
        BoolOrInt::Bool(b) => Ok(b),
        BoolOrInt::Int(0) => Ok(false),
        BoolOrInt::Int(1) => Ok(true),
        BoolOrInt::Int(other) => Err(de::Error::custom(format!("is_confidential out of range: {other}"))),
    }
}
