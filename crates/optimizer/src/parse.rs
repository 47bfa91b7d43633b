//! Single-pass ads.txt syntax parser.
//!
//! Turns raw text into a sequence of typed entries with validity flags.
//! Parsing never fails: unparseable data lines come back as records with
//! `is_valid = false` and a `validation_key` naming the failed rule, so the
//! caller decides what to do with them.

use adstxt_core::records::{ParsedAdsTxtEntry, Relationship, Severity, VariableEntry};
use adstxt_client::fetch::{normalize_domain, validate_domain};

/// Variable keys recognized by the ads.txt specification.
const VARIABLE_TYPES: &[&str] = &["CONTACT", "SUBDOMAIN", "INVENTORYPARTNERDOMAIN", "OWNERDOMAIN", "MANAGERDOMAIN"];

/// One parsed line of an ads.txt file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Record(ParsedAdsTxtEntry),
    Variable(VariableEntry),
}

/// Parse raw ads.txt text into typed lines.
///
/// Comment lines and blank lines are dropped; inline comments are stripped.
/// `owner_domain_hint` is accepted for interface compatibility with callers
/// that know the publisher; the syntax level does not use it.
pub fn parse(raw: &str, _owner_domain_hint: Option<&str>) -> Vec<ParsedLine> {
    raw.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Variable lines have an `=` before any comma.
    let eq = line.find('=');
    let comma = line.find(',');
    if let Some(eq_idx) = eq
        && comma.is_none_or(|c| eq_idx < c)
    {
        let key = line[..eq_idx].trim().to_ascii_uppercase();
        let value = line[eq_idx + 1..].trim();
        if VARIABLE_TYPES.contains(&key.as_str()) && !value.is_empty() {
            return Some(ParsedLine::Variable(VariableEntry { variable_type: key, value: value.to_string() }));
        }
        return Some(ParsedLine::Record(invalid_entry(line, "invalidVariable")));
    }

    Some(ParsedLine::Record(parse_record(line)))
}

fn parse_record(line: &str) -> ParsedAdsTxtEntry {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return invalid_entry(line, "invalidFormat");
    }

    let domain = normalize_domain(fields[0]);
    let account_id = fields[1].to_string();
    let account_type = fields[2].to_string();
    let certification_authority_id = fields
        .get(3)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    if validate_domain(&domain).is_err() {
        return ParsedAdsTxtEntry {
            domain,
            account_id,
            account_type: account_type.clone(),
            relationship: Relationship::Direct,
            certification_authority_id,
            is_valid: false,
            validation_key: Some("invalidDomain".into()),
            severity: Some(Severity::Error),
        };
    }

    if account_id.is_empty() {
        return ParsedAdsTxtEntry {
            domain,
            account_id,
            account_type,
            relationship: Relationship::Direct,
            certification_authority_id,
            is_valid: false,
            validation_key: Some("invalidAccountId".into()),
            severity: Some(Severity::Error),
        };
    }

    let Ok(relationship) = account_type.parse::<Relationship>() else {
        return ParsedAdsTxtEntry {
            domain,
            account_id,
            account_type,
            relationship: Relationship::Direct,
            certification_authority_id,
            is_valid: false,
            validation_key: Some("invalidRelationship".into()),
            severity: Some(Severity::Error),
        };
    };

    ParsedAdsTxtEntry {
        domain,
        account_id,
        account_type,
        relationship,
        certification_authority_id,
        is_valid: true,
        validation_key: None,
        severity: None,
    }
}

fn invalid_entry(line: &str, key: &str) -> ParsedAdsTxtEntry {
    ParsedAdsTxtEntry {
        domain: String::new(),
        account_id: line.to_string(),
        account_type: String::new(),
        relationship: Relationship::Direct,
        certification_authority_id: None,
        is_valid: false,
        validation_key: Some(key.into()),
        severity: Some(Severity::Error),
    }
}

/// Normalize/dedupe primitive used by level-1 optimization.
///
/// Keeps valid records only, deduplicated by
/// `(domain, account_id lowercased, relationship)` with first occurrence
/// winning; variables deduplicated by `(type, value)`.
pub fn normalize_and_dedupe(lines: Vec<ParsedLine>) -> (Vec<VariableEntry>, Vec<ParsedAdsTxtEntry>) {
    use std::collections::HashSet;

    let mut seen_records: HashSet<(String, String, Relationship)> = HashSet::new();
    let mut seen_variables: HashSet<(String, String)> = HashSet::new();
    let mut variables = Vec::new();
    let mut records = Vec::new();

    for line in lines {
        match line {
            ParsedLine::Variable(v) => {
                if seen_variables.insert((v.variable_type.clone(), v.value.clone())) {
                    variables.push(v);
                }
            }
            ParsedLine::Record(r) if r.is_valid => {
                let key = (r.domain.clone(), r.account_id.to_ascii_lowercase(), r.relationship);
                if seen_records.insert(key) {
                    records.push(r);
                }
            }
            ParsedLine::Record(_) => {}
        }
    }

    (variables, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(lines: &[ParsedLine]) -> Vec<&ParsedAdsTxtEntry> {
        lines
            .iter()
            .filter_map(|l| match l {
                ParsedLine::Record(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_basic_record() {
        let lines = parse("google.com, pub-1234, DIRECT, f08c47fec0942fa0", None);
        let records = records(&lines);
        assert_eq!(records.len(), 1);
        let r = records[0];
        assert!(r.is_valid);
        assert_eq!(r.domain, "google.com");
        assert_eq!(r.account_id, "pub-1234");
        assert_eq!(r.relationship, Relationship::Direct);
        assert_eq!(r.certification_authority_id.as_deref(), Some("f08c47fec0942fa0"));
    }

    #[test]
    fn test_parse_lowercases_domain() {
        let lines = parse("OpenX.COM, 123, RESELLER", None);
        assert_eq!(records(&lines)[0].domain, "openx.com");
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let lines = parse("# managed by adops\n\n  \ngoogle.com, pub-1, DIRECT\n", None);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_parse_strips_inline_comment() {
        let lines = parse("google.com, pub-1, DIRECT # banner partner", None);
        let r = records(&lines)[0];
        assert!(r.is_valid);
        assert_eq!(r.account_type, "DIRECT");
    }

    #[test]
    fn test_parse_variable_line() {
        let lines = parse("CONTACT=adops@example.com\nsubdomain=uk.example.com", None);
        assert_eq!(
            lines[0],
            ParsedLine::Variable(VariableEntry {
                variable_type: "CONTACT".into(),
                value: "adops@example.com".into()
            })
        );
        assert_eq!(
            lines[1],
            ParsedLine::Variable(VariableEntry {
                variable_type: "SUBDOMAIN".into(),
                value: "uk.example.com".into()
            })
        );
    }

    #[test]
    fn test_parse_unknown_variable_is_invalid() {
        let lines = parse("FOO=bar", None);
        let r = records(&lines)[0];
        assert!(!r.is_valid);
        assert_eq!(r.validation_key.as_deref(), Some("invalidVariable"));
    }

    #[test]
    fn test_parse_too_few_fields() {
        let lines = parse("google.com, pub-1", None);
        let r = records(&lines)[0];
        assert!(!r.is_valid);
        assert_eq!(r.validation_key.as_deref(), Some("invalidFormat"));
    }

    #[test]
    fn test_parse_bad_relationship() {
        let lines = parse("google.com, pub-1, BOTH", None);
        let r = records(&lines)[0];
        assert!(!r.is_valid);
        assert_eq!(r.validation_key.as_deref(), Some("invalidRelationship"));
    }

    #[test]
    fn test_parse_bad_domain() {
        let lines = parse("not a domain, pub-1, DIRECT", None);
        let r = records(&lines)[0];
        assert!(!r.is_valid);
        assert_eq!(r.validation_key.as_deref(), Some("invalidDomain"));
    }

    #[test]
    fn test_relationship_case_insensitive() {
        let lines = parse("google.com, pub-1, direct", None);
        let r = records(&lines)[0];
        assert!(r.is_valid);
        assert_eq!(r.relationship, Relationship::Direct);
    }

    #[test]
    fn test_dedupe_case_insensitive_account() {
        let lines = parse("google.com, PUB-1, DIRECT\ngoogle.com, pub-1, DIRECT\ngoogle.com, pub-2, DIRECT", None);
        let (_, records) = normalize_and_dedupe(lines);
        assert_eq!(records.len(), 2);
        // First occurrence wins.
        assert_eq!(records[0].account_id, "PUB-1");
    }

    #[test]
    fn test_dedupe_keeps_distinct_relationships() {
        let lines = parse("google.com, pub-1, DIRECT\ngoogle.com, pub-1, RESELLER", None);
        let (_, records) = normalize_and_dedupe(lines);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_dedupe_drops_invalid() {
        let lines = parse("google.com, pub-1, DIRECT\nbroken line\n", None);
        let (_, records) = normalize_and_dedupe(lines);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_dedupe_variables() {
        let lines = parse("CONTACT=a@b.com\nCONTACT=a@b.com\nCONTACT=c@d.com", None);
        let (variables, _) = normalize_and_dedupe(lines);
        assert_eq!(variables.len(), 2);
    }
}
