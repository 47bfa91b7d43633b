//! Single-pass streaming scan over a sellers.json document.
//!
//! Large exchanges publish seller arrays with hundreds of thousands of
//! entries. The scanner deserializes sellers one at a time through a
//! `DeserializeSeed` visitor, keeping only those whose id was requested,
//! and computes document metadata and summary counts in the same pass.
//! The full array is never held in memory.

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::collections::HashSet;
use std::fmt;

use adstxt_core::sellers::{Identifier, Seller, SellerSummary, SellersJsonMetadata, normalize_seller_id};

/// Everything one pass over the document yields.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub metadata: SellersJsonMetadata,
    pub summary: SellerSummary,
    /// Sellers whose normalized id was in the requested set, in document
    /// order.
    pub matches: Vec<Seller>,
}

/// Scan `json` once, collecting sellers whose id (trimmed, lowercased) is
/// in `wanted`, alongside metadata and summary counts.
///
/// Pass an empty `wanted` set to compute metadata and summary only.
pub fn scan_document(json: &str, wanted: &HashSet<String>) -> Result<ScanOutcome, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let outcome = DocumentSeed { wanted }.deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(outcome)
}

struct DocumentSeed<'a> {
    wanted: &'a HashSet<String>,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_> {
    type Value = ScanOutcome;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DocumentVisitor { wanted: self.wanted })
    }
}

struct DocumentVisitor<'a> {
    wanted: &'a HashSet<String>,
}

impl<'de> Visitor<'de> for DocumentVisitor<'_> {
    type Value = ScanOutcome;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sellers.json object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut outcome = ScanOutcome::default();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "contact_email" => outcome.metadata.contact_email = map.next_value()?,
                "version" => outcome.metadata.version = map.next_value()?,
                "identifiers" => outcome.metadata.identifiers = map.next_value::<Vec<Identifier>>()?,
                "sellers" => {
                    let (summary, matches) = map.next_value_seed(SellersSeed { wanted: self.wanted })?;
                    outcome.summary = summary;
                    outcome.matches = matches;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        outcome.metadata.seller_count = outcome.summary.total_count;
        Ok(outcome)
    }
}

struct SellersSeed<'a> {
    wanted: &'a HashSet<String>,
}

impl<'de> DeserializeSeed<'de> for SellersSeed<'_> {
    type Value = (SellerSummary, Vec<Seller>);

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SellersVisitor { wanted: self.wanted })
    }
}

struct SellersVisitor<'a> {
    wanted: &'a HashSet<String>,
}

impl<'de> Visitor<'de> for SellersVisitor<'_> {
    type Value = (SellerSummary, Vec<Seller>);

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sellers array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut summary = SellerSummary::default();
        let mut matches = Vec::new();

        while let Some(seller) = seq.next_element::<Seller>()? {
            summary.total_count += 1;
            if seller.is_confidential {
                summary.confidential_count += 1;
            }
            if self.wanted.contains(&normalize_seller_id(&seller.seller_id)) {
                matches.push(seller);
            }
        }

        Ok((summary, matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "contact_email": "adops@openx.com",
        "version": "1.0",
        "identifiers": [
            {"name": "TAG-ID", "value": "6a698e2ec38604c6"}
        ],
        "sellers": [
            {"seller_id": "pub-1", "name": "Alpha Media", "domain": "alpha.example", "seller_type": "PUBLISHER", "is_confidential": 0},
            {"seller_id": "pub-2", "is_confidential": 1},
            {"seller_id": 540940, "name": "Gamma", "seller_type": "BOTH"}
        ]
    }"#;

    fn wanted(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| normalize_seller_id(id)).collect()
    }

    #[test]
    fn test_scan_metadata_and_summary() {
        let outcome = scan_document(DOC, &HashSet::new()).unwrap();
        assert_eq!(outcome.summary.total_count, 3);
        assert_eq!(outcome.summary.confidential_count, 1);
        assert_eq!(outcome.metadata.seller_count, 3);
        assert_eq!(outcome.metadata.contact_email.as_deref(), Some("adops@openx.com"));
        assert_eq!(outcome.metadata.version.as_deref(), Some("1.0"));
        assert_eq!(outcome.metadata.tag_id(), Some("6a698e2ec38604c6"));
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn test_scan_targeted_match() {
        let outcome = scan_document(DOC, &wanted(&["pub-2"])).unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].seller_id, "pub-2");
        assert!(outcome.matches[0].is_confidential);
    }

    #[test]
    fn test_scan_match_is_case_insensitive() {
        let outcome = scan_document(DOC, &wanted(&["PUB-1"])).unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].name.as_deref(), Some("Alpha Media"));
    }

    #[test]
    fn test_scan_numeric_seller_id() {
        let outcome = scan_document(DOC, &wanted(&["540940"])).unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].seller_id, "540940");
    }

    #[test]
    fn test_scan_no_match() {
        let outcome = scan_document(DOC, &wanted(&["pub-999"])).unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.summary.total_count, 3);
    }

    #[test]
    fn test_scan_ignores_unknown_fields() {
        let doc = r#"{"ext": {"nested": [1, 2]}, "sellers": []}"#;
        let outcome = scan_document(doc, &HashSet::new()).unwrap();
        assert_eq!(outcome.summary.total_count, 0);
    }

    #[test]
    fn test_scan_rejects_malformed_json() {
        assert!(scan_document("{\"sellers\": [", &HashSet::new()).is_err());
        assert!(scan_document("not json", &HashSet::new()).is_err());
    }

    #[test]
    fn test_scan_missing_sellers_key() {
        let outcome = scan_document(r#"{"version": "1.0"}"#, &HashSet::new()).unwrap();
        assert_eq!(outcome.summary.total_count, 0);
        assert_eq!(outcome.metadata.version.as_deref(), Some("1.0"));
    }
}
