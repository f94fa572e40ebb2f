//! Company registry lookup.
//!
//! Registry records are near-immutable, so lookups are cached for a month.
//! The upstream speaks the Companies House `GET /company/{number}` shape;
//! any registry serving the same fields can be pointed at with
//! [`CompanyAdapter::with_base_url`].

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, ResponseCache, Ttl};
use crate::error::{HuginnError, Result};
use crate::http::{FetchClient, FetchOptions};

const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

/// Normalized company record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub incorporated: Option<String>,
    pub address: Option<String>,
    pub industry_codes: Vec<String>,
}

#[derive(Deserialize)]
struct WireCompany {
    company_number: String,
    company_name: String,
    #[serde(default)]
    company_status: Option<String>,
    #[serde(default)]
    date_of_creation: Option<String>,
    #[serde(default)]
    registered_office_address: Option<WireAddress>,
    #[serde(default)]
    sic_codes: Vec<String>,
}

#[derive(Deserialize)]
struct WireAddress {
    #[serde(default)]
    address_line_1: Option<String>,
    #[serde(default)]
    address_line_2: Option<String>,
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl WireAddress {
    fn one_line(self) -> Option<String> {
        let parts: Vec<String> = [
            self.address_line_1,
            self.address_line_2,
            self.locality,
            self.postal_code,
            self.country,
        ]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl From<WireCompany> for Company {
    fn from(w: WireCompany) -> Self {
        Self {
            id: w.company_number,
            name: w.company_name,
            status: w.company_status,
            incorporated: w.date_of_creation,
            address: w.registered_office_address.and_then(WireAddress::one_line),
            industry_codes: w.sic_codes,
        }
    }
}

/// Company id: 1–32 ASCII alphanumerics or `-`.
pub fn validate_company_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= 32
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(HuginnError::Validation(format!("invalid company id '{id}'")))
    }
}

#[derive(Clone)]
pub struct CompanyAdapter {
    client: FetchClient,
    cache: ResponseCache,
    base_url: String,
    api_key: Option<String>,
}

impl CompanyAdapter {
    pub fn new(client: FetchClient, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }

    /// Create an adapter with a custom base URL (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Registry API key, sent as the HTTP basic username.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Look up a company by registry id.
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, id: &str) -> Result<Company> {
        let id = id.trim();
        validate_company_id(id)?;
        let key = CacheKey::builder("company", "lookup").param("id", id).build();

        self.cache
            .load_or_compute(&key, Ttl::Monthly, || async {
                let url = format!("{}/company/{}", self.base_url, id);
                let mut options = FetchOptions::new().header("Accept", "application/json");
                if let Some(ref key) = self.api_key {
                    options = options.basic_auth(key, None);
                }
                let wire: WireCompany = self.client.get_json(&url, &options).await?;
                Ok(Company::from(wire))
            })
            .await
    }
}
