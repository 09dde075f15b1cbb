//! Fortune-ranked company directory
//!
//! The directory holds the roster of companies eligible for an analysis
//! run: CIK, display name, ticker, Fortune rank, and sector/industry
//! classification. The embedded roster covers the top segment of the
//! ranking; extend it by editing `companies.json`.
//!
//! The directory is an owned object constructed once at startup and passed
//! by reference to whoever needs lookups. There is intentionally no global
//! instance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Embedded roster data
const ROSTER_JSON: &str = include_str!("companies.json");

/// Metadata for one company in the roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// SEC Central Index Key, digits only, no padding
    pub cik: String,
    /// Display name
    pub name: String,
    /// Primary ticker symbol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Fortune rank, 1 = largest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Fortune sector classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Fortune industry classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

/// Directory of Fortune-ranked companies with CIK lookup
#[derive(Debug, Clone)]
pub struct CompanyDirectory {
    #[allow(dead_code)]
    schema_version: String,
    #[allow(dead_code)]
    last_updated: String,
    companies: Vec<CompanyInfo>,
    index_by_cik: HashMap<String, usize>,
}

impl CompanyDirectory {
    /// Load the embedded roster, returning an owned directory
    pub fn load_embedded() -> Result<Self, DirectoryError> {
        Self::from_json(ROSTER_JSON)
    }

    /// Parse a roster from JSON
    fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let raw: RawRoster = serde_json::from_str(json)
            .map_err(|e| DirectoryError::ParseError(format!("Failed to parse roster: {e}")))?;

        let mut companies = raw.companies;
        // Rank order with unranked entries last; name breaks ties so the
        // ordering is stable across loads
        companies.sort_by(|a, b| {
            let a_key = (a.rank.is_none(), a.rank, &a.name);
            let b_key = (b.rank.is_none(), b.rank, &b.name);
            a_key.cmp(&b_key)
        });

        let mut index_by_cik = HashMap::new();
        for (i, company) in companies.iter().enumerate() {
            let key = normalize_cik(&company.cik);
            if key.is_empty() {
                return Err(DirectoryError::ParseError(format!(
                    "Roster entry '{}' has an empty CIK",
                    company.name
                )));
            }
            if index_by_cik.insert(key, i).is_some() {
                return Err(DirectoryError::ParseError(format!(
                    "Duplicate CIK {} in roster",
                    company.cik
                )));
            }
        }

        Ok(Self {
            schema_version: raw.schema_version,
            last_updated: raw.last_updated,
            companies,
            index_by_cik,
        })
    }

    /// All companies in rank order
    pub fn companies(&self) -> &[CompanyInfo] {
        &self.companies
    }

    /// Number of companies in the roster
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    /// Whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Look up one company by CIK
    ///
    /// Zero padding is ignored, so `"0000320193"` and `"320193"` resolve
    /// to the same entry.
    pub fn get_company_by_cik(&self, cik: &str) -> Option<&CompanyInfo> {
        let key = normalize_cik(cik);
        self.index_by_cik.get(&key).map(|&i| &self.companies[i])
    }

    /// Top `n` companies by Fortune rank
    pub fn top_companies(&self, n: usize) -> Vec<&CompanyInfo> {
        self.companies.iter().take(n).collect()
    }
}

/// Strip whitespace and leading zeros so padded and bare CIKs compare equal
fn normalize_cik(cik: &str) -> String {
    cik.trim().trim_start_matches('0').to_string()
}

/// Raw roster structure for deserialization
#[derive(Debug, Deserialize)]
struct RawRoster {
    schema_version: String,
    last_updated: String,
    companies: Vec<CompanyInfo>,
}

/// Errors that can occur when loading the roster
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Failed to parse roster JSON
    #[error("roster parse error: {0}")]
    ParseError(String),
}
