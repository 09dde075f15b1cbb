//! SEC EDGAR company data extractor
//!
//! Pulls tax-expense figures from `us-gaap` concepts and executive
//! compensation from the `ecd` pay-versus-performance concepts, one
//! companyconcept call per (company, concept).

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::edgar_config::{
    ECD_TAXONOMY, EDGAR_CONFIG, NEO_AVG_TOTAL_COMP_TAG, NEO_DISPLAY_NAME, PEO_DISPLAY_NAME,
    PEO_TOTAL_COMP_TAG, TAX_EXPENSE_TAG, US_GAAP_TAXONOMY,
};
use super::edgar_http::EdgarHttpClient;
use super::facts::{CompanyConcept, FactSelector};
use super::{CompanyDataExtractor, ExtractError, ExtractResult};
use crate::checkpoint::record::{CompensationRecord, TaxExpense};
use crate::orchestrator::rate_limit::RateLimiter;

/// EDGAR-backed implementation of [`CompanyDataExtractor`]
pub struct EdgarExtractor {
    http_client: EdgarHttpClient,
}

impl EdgarExtractor {
    /// Create a new EDGAR extractor
    ///
    /// # Arguments
    /// * `user_agent` - Contact string EDGAR requires from automated clients
    pub fn new(user_agent: impl Into<String>) -> ExtractResult<Self> {
        Self::new_with_base_url(user_agent, EDGAR_CONFIG.base_url)
    }

    /// Create with custom base URL (for testing)
    pub fn new_with_base_url(
        user_agent: impl Into<String>,
        base_url: impl Into<String>,
    ) -> ExtractResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent.into())
            .build()
            .map_err(|e| ExtractError::ConfigError(format!("HTTP client build failed: {}", e)))?;
        let rate_limiter = Arc::new(RateLimiter::request_based(
            EDGAR_CONFIG.max_requests_per_second,
            Duration::from_secs(1),
        ));
        let http_client = EdgarHttpClient::new(Arc::new(client), base_url, rate_limiter);

        Ok(Self { http_client })
    }

    /// Normalize a CIK to EDGAR's zero-padded 10-digit form
    fn format_cik(cik: &str) -> ExtractResult<String> {
        let trimmed = cik.trim();
        if trimmed.is_empty()
            || trimmed.len() > 10
            || !trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ExtractError::InvalidCik(cik.to_string()));
        }
        Ok(format!("{:0>10}", trimmed))
    }

    /// Build the companyconcept endpoint path for one concept
    fn concept_endpoint(cik10: &str, taxonomy: &str, tag: &str) -> String {
        format!(
            "{}/CIK{}/{}/{}.json",
            EDGAR_CONFIG.company_concept_endpoint, cik10, taxonomy, tag
        )
    }

    /// Fetch one concept; a 404 means the company never tagged it
    async fn fetch_concept(
        &self,
        cik: &str,
        taxonomy: &str,
        tag: &str,
    ) -> ExtractResult<Option<CompanyConcept>> {
        let cik10 = Self::format_cik(cik)?;
        let endpoint = Self::concept_endpoint(&cik10, taxonomy, tag);

        match self.http_client.get::<CompanyConcept>(&endpoint).await {
            Ok(concept) => Ok(Some(concept)),
            Err(ExtractError::NotFound(_)) => {
                debug!(
                    cik = %cik,
                    taxonomy = %taxonomy,
                    tag = %tag,
                    "Concept never reported by company"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CompanyDataExtractor for EdgarExtractor {
    async fn extract_tax_expense(
        &self,
        cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Option<TaxExpense>> {
        let Some(concept) = self
            .fetch_concept(cik, US_GAAP_TAXONOMY, TAX_EXPENSE_TAG)
            .await?
        else {
            return Ok(None);
        };

        let Some(fact) = FactSelector::annual_fact(&concept, fiscal_year) else {
            debug!(cik = %cik, fiscal_year, "No annual tax fact for year");
            return Ok(None);
        };

        debug!(
            cik = %cik,
            fiscal_year,
            value = %fact.val,
            form = fact.form.as_deref().unwrap_or("?"),
            "Tax expense extracted"
        );

        Ok(Some(TaxExpense {
            fiscal_year,
            total_tax_expense: Some(fact.val),
            source_form: fact.form.clone(),
            period_end: Some(fact.end.clone()),
        }))
    }

    async fn extract_executive_compensation(
        &self,
        cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Vec<CompensationRecord>> {
        let mut records = Vec::new();

        if let Some(concept) = self.fetch_concept(cik, ECD_TAXONOMY, PEO_TOTAL_COMP_TAG).await? {
            if let Some(fact) = FactSelector::annual_fact_by_period(&concept, fiscal_year) {
                records.push(CompensationRecord {
                    executive_name: PEO_DISPLAY_NAME.to_string(),
                    position: Some("PEO".to_string()),
                    fiscal_year,
                    total_compensation: fact.val,
                    salary: None,
                    bonus: None,
                });
            }
        }

        if let Some(concept) = self
            .fetch_concept(cik, ECD_TAXONOMY, NEO_AVG_TOTAL_COMP_TAG)
            .await?
        {
            if let Some(fact) = FactSelector::annual_fact_by_period(&concept, fiscal_year) {
                records.push(CompensationRecord {
                    executive_name: NEO_DISPLAY_NAME.to_string(),
                    position: Some("NEO (average)".to_string()),
                    fiscal_year,
                    total_compensation: fact.val,
                    salary: None,
                    bonus: None,
                });
            }
        }

        debug!(
            cik = %cik,
            fiscal_year,
            records = records.len(),
            "Compensation extraction finished"
        );

        Ok(records)
    }

    fn base_url(&self) -> &str {
        self.http_client.base_url()
    }
}
