//! Persisted sellers.json summary rows.
//!
//! A summary row is derived data: metadata and aggregate counts computed
//! during one full pass over a sellers.json document, persisted so later
//! metadata queries never re-materialize the seller array.

use super::connection::CacheDb;
use crate::Error;
use crate::sellers::{Identifier, SellerSummary, SellersJsonMetadata};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One persisted summary per sellers.json domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerSummaryRow {
    pub domain: String,
    pub seller_count: u64,
    pub confidential_count: u64,
    pub contact_email: Option<String>,
    pub version: Option<String>,
    /// JSON-encoded `Vec<Identifier>`.
    pub identifiers_json: String,
    /// RFC 3339 timestamp of the content pass that produced this row.
    pub updated_at: String,
}

impl SellerSummaryRow {
    /// Build a row from the outcome of one document pass.
    pub fn from_parts(
        domain: &str, metadata: &SellersJsonMetadata, summary: &SellerSummary, updated_at: &str,
    ) -> Result<Self, Error> {
        let identifiers_json =
            serde_json::to_string(&metadata.identifiers).map_err(|e| Error::ParseFailed(e.to_string()))?;
        Ok(Self {
            domain: domain.to_string(),
            seller_count: summary.total_count,
            confidential_count: summary.confidential_count,
            contact_email: metadata.contact_email.clone(),
            version: metadata.version.clone(),
            identifiers_json,
            updated_at: updated_at.to_string(),
        })
    }

    /// Recover the metadata view from the persisted row.
    pub fn metadata(&self) -> Result<SellersJsonMetadata, Error> {
        let identifiers: Vec<Identifier> =
            serde_json::from_str(&self.identifiers_json).map_err(|e| Error::ParseFailed(e.to_string()))?;
        Ok(SellersJsonMetadata {
            seller_count: self.seller_count,
            identifiers,
            contact_email: self.contact_email.clone(),
            version: self.version.clone(),
        })
    }

    /// Recover the summary counts from the persisted row.
    pub fn summary(&self) -> SellerSummary {
        SellerSummary { total_count: self.seller_count, confidential_count: self.confidential_count }
    }
}

impl CacheDb {
    /// Insert or update a seller summary row.
    pub async fn upsert_seller_summary(&self, row: &SellerSummaryRow) -> Result<(), Error> {
        let row = row.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO seller_summaries (
                        domain, seller_count, confidential_count,
                        contact_email, version, identifiers_json, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(domain) DO UPDATE SET
                        seller_count = excluded.seller_count,
                        confidential_count = excluded.confidential_count,
                        contact_email = excluded.contact_email,
                        version = excluded.version,
                        identifiers_json = excluded.identifiers_json,
                        updated_at = excluded.updated_at",
                    params![
                        &row.domain,
                        row.seller_count as i64,
                        row.confidential_count as i64,
                        &row.contact_email,
                        &row.version,
                        &row.identifiers_json,
                        &row.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a seller summary row by domain.
    ///
    /// Returns None if no content pass has ever produced one.
    pub async fn get_seller_summary(&self, domain: &str) -> Result<Option<SellerSummaryRow>, Error> {
        let domain = domain.to_string();
        self.conn
            .call(move |conn| -> Result<Option<SellerSummaryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT domain, seller_count, confidential_count,
                            contact_email, version, identifiers_json, updated_at
                     FROM seller_summaries WHERE domain = ?1",
                )?;

                let result = stmt.query_row(params![domain], |row| {
                    Ok(SellerSummaryRow {
                        domain: row.get(0)?,
                        seller_count: row.get::<_, i64>(1)? as u64,
                        confidential_count: row.get::<_, i64>(2)? as u64,
                        contact_email: row.get(3)?,
                        version: row.get(4)?,
                        identifiers_json: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_row(domain: &str) -> SellerSummaryRow {
        let metadata = SellersJsonMetadata {
            seller_count: 3,
            identifiers: vec![Identifier { name: "TAG-ID".into(), value: "abc".into() }],
            contact_email: Some("ads@example.com".into()),
            version: Some("1.0".into()),
        };
        let summary = SellerSummary { total_count: 3, confidential_count: 1 };
        SellerSummaryRow::from_parts(domain, &metadata, &summary, &Utc::now().to_rfc3339()).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get_summary() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.upsert_seller_summary(&make_row("openx.com")).await.unwrap();

        let row = db.get_seller_summary("openx.com").await.unwrap().unwrap();
        assert_eq!(row.seller_count, 3);
        assert_eq!(row.confidential_count, 1);

        let metadata = row.metadata().unwrap();
        assert_eq!(metadata.tag_id(), Some("abc"));
        assert_eq!(metadata.contact_email.as_deref(), Some("ads@example.com"));
        assert_eq!(row.summary().total_count, 3);
    }

    #[tokio::test]
    async fn test_get_summary_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_seller_summary("nowhere.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summary_replaced_on_conflict() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.upsert_seller_summary(&make_row("openx.com")).await.unwrap();

        let mut updated = make_row("openx.com");
        updated.seller_count = 10;
        db.upsert_seller_summary(&updated).await.unwrap();

        let row = db.get_seller_summary("openx.com").await.unwrap().unwrap();
        assert_eq!(row.seller_count, 10);
    }
}
