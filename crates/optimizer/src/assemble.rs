//! Deterministic rendering of the optimized ads.txt text.
//!
//! Output layout:
//!
//! 1. Variable declarations, grouped by type, types sorted
//!    lexicographically, each group under a `# <TYPE> Variables` header.
//! 2. `# Advertising System Records` with confirmed (`Other`) records.
//! 3. `# Confidential Sellers`, when non-empty.
//! 4. `# Records Not Found in Sellers.json`, when non-empty.
//! 5. `# Systems Without Sellers.json`, when non-empty.
//!
//! Within each section records sort by domain, then DIRECT before
//! RESELLER, then account id. The output depends only on the input sets,
//! never on fetch completion order.

use std::collections::BTreeMap;

use adstxt_core::records::{ClassifiedRecord, RecordCategory, VariableEntry};

const RECORDS_HEADER: &str = "# Advertising System Records";
const CONFIDENTIAL_HEADER: &str = "# Confidential Sellers";
const MISSING_HEADER: &str = "# Records Not Found in Sellers.json";
const NO_SELLERS_JSON_HEADER: &str = "# Systems Without Sellers.json";

/// Render classified records and variables into the final text.
pub fn assemble(records: &[ClassifiedRecord], variables: &[VariableEntry]) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.extend(render_variables(variables));

    let mut by_category: BTreeMap<u8, Vec<&ClassifiedRecord>> = BTreeMap::new();
    for record in records {
        by_category.entry(category_rank(record.category)).or_default().push(record);
    }

    for (rank, header, always) in [
        (0u8, RECORDS_HEADER, true),
        (1, CONFIDENTIAL_HEADER, false),
        (2, MISSING_HEADER, false),
        (3, NO_SELLERS_JSON_HEADER, false),
    ] {
        let group = by_category.get(&rank).map(Vec::as_slice).unwrap_or_default();
        if group.is_empty() && !always {
            continue;
        }
        let mut lines = vec![header.to_string()];
        lines.extend(sorted_lines(group));
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn category_rank(category: RecordCategory) -> u8 {
    match category {
        RecordCategory::Other => 0,
        RecordCategory::Confidential => 1,
        RecordCategory::MissingSellerId => 2,
        RecordCategory::NoSellerJson => 3,
    }
}

fn render_variables(variables: &[VariableEntry]) -> Vec<String> {
    let mut by_type: BTreeMap<&str, Vec<&VariableEntry>> = BTreeMap::new();
    for variable in variables {
        by_type.entry(variable.variable_type.as_str()).or_default().push(variable);
    }

    by_type
        .into_iter()
        .map(|(variable_type, group)| {
            let mut lines = vec![format!("# {variable_type} Variables")];
            lines.extend(group.iter().map(|v| format!("{}={}", v.variable_type, v.value)));
            lines.join("\n")
        })
        .collect()
}

fn sorted_lines(group: &[&ClassifiedRecord]) -> Vec<String> {
    let mut group: Vec<&ClassifiedRecord> = group.to_vec();
    group.sort_by(|a, b| {
        a.entry
            .domain
            .cmp(&b.entry.domain)
            .then_with(|| a.entry.relationship.rank().cmp(&b.entry.relationship.rank()))
            .then_with(|| a.entry.account_id.cmp(&b.entry.account_id))
    });
    group.iter().map(|r| r.to_line()).collect()
}
