//! EDGAR companyconcept payload models and fact selection
//!
//! A companyconcept response carries every period a company ever reported
//! for one concept, across all filings. Selection picks the single fact
//! that best represents a requested fiscal year.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Unit key for US-dollar facts in concept payloads
pub const USD_UNIT: &str = "USD";

/// Shortest period length still counted as a full fiscal year.
/// 52-week retail calendars produce 364-day years.
const ANNUAL_PERIOD_MIN_DAYS: i64 = 330;

/// Longest period length still counted as a full fiscal year.
/// 53-week retail calendars produce 371-day years.
const ANNUAL_PERIOD_MAX_DAYS: i64 = 400;

/// One reported fact for a concept
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptFact {
    /// Period start date (absent on instant facts)
    #[serde(default)]
    pub start: Option<String>,
    /// Period end date
    pub end: String,
    /// Reported value
    pub val: Decimal,
    /// Accession number of the filing that reported the fact
    #[serde(default)]
    pub accn: Option<String>,
    /// Fiscal year of the reporting filing, not necessarily of the fact:
    /// comparative rows carry the reporting filing's label
    #[serde(default)]
    pub fy: Option<i32>,
    /// Fiscal period of the reporting filing (FY, Q1..Q4)
    #[serde(default)]
    pub fp: Option<String>,
    /// Form type of the reporting filing (10-K, 8-K, DEF 14A, ...)
    #[serde(default)]
    pub form: Option<String>,
    /// Date the reporting filing was filed
    #[serde(default)]
    pub filed: Option<String>,
    /// XBRL frame EDGAR assigned, when any
    #[serde(default)]
    pub frame: Option<String>,
}

/// companyconcept response: one concept for one company, grouped by unit
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConcept {
    /// Company CIK as a bare number
    pub cik: u64,
    /// Taxonomy the concept belongs to (us-gaap, ecd, ...)
    pub taxonomy: String,
    /// Concept tag name
    pub tag: String,
    /// Human-readable concept label
    #[serde(default)]
    pub label: Option<String>,
    /// Registrant name as EDGAR knows it
    #[serde(default, rename = "entityName")]
    pub entity_name: Option<String>,
    /// Facts grouped by unit of measure
    #[serde(default)]
    pub units: BTreeMap<String, Vec<ConceptFact>>,
}

/// Fact selection over companyconcept payloads
pub struct FactSelector;

impl FactSelector {
    /// Pick the annual USD fact a company reported for `fiscal_year`
    ///
    /// Prefers the figure from that year's own annual filing (`fy` matches
    /// and `fp == "FY"`); when the filer's labels are unusable, falls back
    /// to matching on the year the covered period ends. Restated duplicates
    /// resolve to the most recently filed figure.
    pub fn annual_fact(concept: &CompanyConcept, fiscal_year: i32) -> Option<&ConceptFact> {
        let facts = concept.units.get(USD_UNIT)?;

        let own_year: Vec<&ConceptFact> = facts
            .iter()
            .filter(|f| Self::is_annual(f))
            .filter(|f| f.fy == Some(fiscal_year) && f.fp.as_deref() == Some("FY"))
            .collect();
        if let Some(best) = Self::latest_filed(own_year) {
            return Some(best);
        }

        let by_period: Vec<&ConceptFact> = facts
            .iter()
            .filter(|f| Self::is_annual(f))
            .filter(|f| Self::end_year(f) == Some(fiscal_year))
            .collect();
        Self::latest_filed(by_period)
    }

    /// Pick the annual USD fact whose covered period ends in `fiscal_year`,
    /// regardless of which filing reported it
    ///
    /// Pay-versus-performance tables restate several prior years in each
    /// proxy and label every row with the proxy's own fiscal year, so the
    /// period end is the only reliable per-year key for those concepts.
    pub fn annual_fact_by_period(
        concept: &CompanyConcept,
        fiscal_year: i32,
    ) -> Option<&ConceptFact> {
        let facts = concept.units.get(USD_UNIT)?;

        let matching: Vec<&ConceptFact> = facts
            .iter()
            .filter(|f| Self::is_annual(f))
            .filter(|f| Self::end_year(f) == Some(fiscal_year))
            .collect();
        Self::latest_filed(matching)
    }

    /// Whether the fact covers a full fiscal year
    fn is_annual(fact: &ConceptFact) -> bool {
        let Some(start) = fact.start.as_deref().and_then(Self::parse_date) else {
            return false;
        };
        let Some(end) = Self::parse_date(&fact.end) else {
            return false;
        };
        let days = (end - start).num_days();
        (ANNUAL_PERIOD_MIN_DAYS..=ANNUAL_PERIOD_MAX_DAYS).contains(&days)
    }

    /// Year the covered period ends in
    fn end_year(fact: &ConceptFact) -> Option<i32> {
        Self::parse_date(&fact.end).map(|d| d.year())
    }

    fn parse_date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    /// Most recently filed fact; `filed`-less facts lose to dated ones
    fn latest_filed(mut facts: Vec<&ConceptFact>) -> Option<&ConceptFact> {
        facts.sort_by(|a, b| a.filed.cmp(&b.filed));
        facts.pop()
    }
}
