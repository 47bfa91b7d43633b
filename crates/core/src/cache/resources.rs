//! Cached resource CRUD operations.
//!
//! One row per `(resource_type, domain)`. A completed fetch attempt always
//! produces a row, whatever its outcome; the outcome lives in
//! [`FetchStatus`], never in an error.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// The two resource kinds this cache knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    AdsTxt,
    SellersJson,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::AdsTxt => "ads_txt",
            ResourceType::SellersJson => "sellers_json",
        }
    }

    /// Well-known path of the resource on its host.
    pub fn well_known_path(self) -> &'static str {
        match self {
            ResourceType::AdsTxt => "ads.txt",
            ResourceType::SellersJson => "sellers.json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ads_txt" => Some(ResourceType::AdsTxt),
            "sellers_json" => Some(ResourceType::SellersJson),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent fetch attempt for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// 200 with a matching content type; content is present.
    Success,
    /// 404 from the host.
    NotFound,
    /// 200 but the content type did not match the resource (commonly an
    /// HTML error page served with a 200).
    InvalidFormat,
    /// Transport failure, timeout, oversize body, or unexpected status.
    Error,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Success => "success",
            FetchStatus::NotFound => "not_found",
            FetchStatus::InvalidFormat => "invalid_format",
            FetchStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FetchStatus::Success),
            "not_found" => Some(FetchStatus::NotFound),
            "invalid_format" => Some(FetchStatus::InvalidFormat),
            "error" => Some(FetchStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached remote resource for one `(resource_type, domain)` pair.
///
/// Invariant: `content` is `Some` iff `status` is `Success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResource {
    pub resource_type: ResourceType,
    /// Normalized lowercase domain.
    pub domain: String,
    pub status: FetchStatus,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub content: Option<String>,
    /// RFC 3339 timestamp of the last completed fetch attempt.
    pub updated_at: String,
}

impl CachedResource {
    /// Whether the row holds usable content.
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

/// TTL check over an RFC 3339 timestamp.
///
/// Unparseable timestamps count as expired so a corrupt row triggers a
/// refetch rather than being served forever.
pub fn is_expired(updated_at: &str, ttl: Duration) -> bool {
    match DateTime::parse_from_rfc3339(updated_at) {
        Ok(t) => {
            let age = Utc::now().signed_duration_since(t.with_timezone(&Utc));
            age.num_milliseconds() < 0 || age.to_std().map(|a| a >= ttl).unwrap_or(true)
        }
        Err(_) => true,
    }
}

impl CacheDb {
    /// Insert or update a cached resource.
    ///
    /// Uses UPSERT semantics: inserts if `(resource_type, domain)` doesn't
    /// exist, replaces all fields if it does.
    pub async fn upsert_resource(&self, resource: &CachedResource) -> Result<(), Error> {
        let resource = resource.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cached_resources (
                        resource_type, domain, status, status_code,
                        error_message, content, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(resource_type, domain) DO UPDATE SET
                        status = excluded.status,
                        status_code = excluded.status_code,
                        error_message = excluded.error_message,
                        content = excluded.content,
                        updated_at = excluded.updated_at",
                    params![
                        resource.resource_type.as_str(),
                        &resource.domain,
                        resource.status.as_str(),
                        &resource.status_code,
                        &resource.error_message,
                        &resource.content,
                        &resource.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a cached resource by `(resource_type, domain)`.
    ///
    /// Returns None if no fetch has ever completed for the pair.
    pub async fn get_resource(
        &self, resource_type: ResourceType, domain: &str,
    ) -> Result<Option<CachedResource>, Error> {
        let domain = domain.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResource>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT resource_type, domain, status, status_code,
                            error_message, content, updated_at
                     FROM cached_resources
                     WHERE resource_type = ?1 AND domain = ?2",
                )?;

                let result = stmt.query_row(params![resource_type.as_str(), domain], |row| {
                    let type_str: String = row.get(0)?;
                    let status_str: String = row.get(2)?;
                    Ok(CachedResource {
                        resource_type: ResourceType::parse(&type_str).unwrap_or(ResourceType::SellersJson),
                        domain: row.get(1)?,
                        status: FetchStatus::parse(&status_str).unwrap_or(FetchStatus::Error),
                        status_code: row.get(3)?,
                        error_message: row.get(4)?,
                        content: row.get(5)?,
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

    /// Delete resource rows older than the given TTL.
    ///
    /// Maintenance helper for long-running deployments; the optimizer
    /// itself never deletes rows. Returns the number of deleted entries.
    pub async fn purge_stale_resources(&self, ttl: Duration) -> Result<u64, Error> {
        let cutoff = (Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())).to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cached_resources WHERE updated_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all cached rows for a domain, both resource types and any
    /// persisted summary. Returns the number of deleted entries.
    pub async fn purge_domain(&self, domain: &str) -> Result<u64, Error> {
        let domain = domain.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let resources = conn.execute("DELETE FROM cached_resources WHERE domain = ?1", params![domain])?;
                let summaries = conn.execute("DELETE FROM seller_summaries WHERE domain = ?1", params![domain])?;
                Ok((resources + summaries) as u64)
            })
            .await
            .map_err(Error::from)
    }
}
