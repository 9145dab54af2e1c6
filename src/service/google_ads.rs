//! Google Ads REST API integration.
//!
//! Portfolio bidding strategies are read with a GAQL search and written
//! back with one `biddingStrategies:mutate` update per call.
//!
//! API docs: https://developers.google.com/google-ads/api/rest/overview
//! Auth: OAuth2 bearer token plus `developer-token` header. Manager
//! accounts additionally send `login-customer-id`.
//!
//! int64 fields (ids, micros) are encoded as JSON strings by the API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{BiddingStrategyService, StrategySelector};
use crate::config::AppConfig;
use crate::types::{
    BidError, BidResult, BiddingScheme, Micros, PortfolioStrategy, StrategyStatus, StrategyType,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SERVICE_NAME: &str = "google_ads";

/// Fields selected for every strategy, whatever its scheme.
const BASE_FIELDS: &[&str] = &[
    "bidding_strategy.resource_name",
    "bidding_strategy.id",
    "bidding_strategy.name",
    "bidding_strategy.status",
    "bidding_strategy.type",
];

/// Connection settings for the Google Ads client.
#[derive(Debug)]
pub struct GoogleAdsSettings {
    pub base_url: String,
    pub version: String,
    /// Digits only, no dashes.
    pub customer_id: String,
    pub login_customer_id: Option<String>,
    pub developer_token: Secret<String>,
    pub access_token: Secret<String>,
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// API response types (Google Ads JSON → Rust)
// ---------------------------------------------------------------------------

/// int64 as the API sends it (string), tolerating plain numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiInt64 {
    Str(String),
    Num(i64),
}

impl ApiInt64 {
    fn parse(&self, field: &str) -> BidResult<i64> {
        match self {
            ApiInt64::Num(n) => Ok(*n),
            ApiInt64::Str(s) => s.parse().map_err(|_| {
                BidError::service(SERVICE_NAME, format!("invalid int64 in {field}: {s:?}"))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRow {
    bidding_strategy: ApiBiddingStrategy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBiddingStrategy {
    resource_name: String,
    #[serde(default)]
    id: Option<ApiInt64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "type", default)]
    strategy_type: Option<String>,

    #[serde(default)]
    target_cpa: Option<ApiScheme>,
    #[serde(default)]
    target_spend: Option<ApiScheme>,
    #[serde(default)]
    target_roas: Option<ApiScheme>,
    #[serde(default)]
    maximize_conversions: Option<ApiScheme>,
    #[serde(default)]
    target_impression_share: Option<ApiScheme>,
}

/// The subset of scheme fields this tool reads and writes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScheme {
    #[serde(default)]
    target_cpa_micros: Option<ApiInt64>,
    #[serde(default)]
    cpc_bid_ceiling_micros: Option<ApiInt64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateResponse {
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateResult {
    #[serde(default)]
    resource_name: String,
}

// ---------------------------------------------------------------------------
// Scheme field mapping
// ---------------------------------------------------------------------------

/// (GAQL/field-mask name, JSON key) of the scheme object for a strategy type.
fn scheme_field(strategy_type: &StrategyType) -> Option<(&'static str, &'static str)> {
    match strategy_type {
        StrategyType::TargetCpa => Some(("target_cpa", "targetCpa")),
        StrategyType::TargetSpend => Some(("target_spend", "targetSpend")),
        StrategyType::TargetRoas => Some(("target_roas", "targetRoas")),
        StrategyType::MaximizeConversions => Some(("maximize_conversions", "maximizeConversions")),
        StrategyType::TargetImpressionShare => {
            Some(("target_impression_share", "targetImpressionShare"))
        }
        StrategyType::Other(_) => None,
    }
}

/// Build the GAQL search query for a selector.
fn build_query(selector: &StrategySelector) -> String {
    let schemed = [
        StrategyType::TargetCpa,
        StrategyType::TargetSpend,
        StrategyType::TargetRoas,
        StrategyType::MaximizeConversions,
        StrategyType::TargetImpressionShare,
    ];

    let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
    for t in &schemed {
        if let Some((path, _)) = scheme_field(t) {
            fields.push(format!("bidding_strategy.{path}.cpc_bid_ceiling_micros"));
            if t.has_target_cpa() {
                fields.push(format!("bidding_strategy.{path}.target_cpa_micros"));
            }
        }
    }

    let mut query = format!("SELECT {} FROM bidding_strategy", fields.join(", "));
    if let Some(clause) = selector.where_clause() {
        query.push(' ');
        query.push_str(&clause);
    }
    query
}

/// Convert an API row into a `PortfolioStrategy`.
///
/// Known scheme types always get a scheme (the API omits the object when
/// all of its fields are unset); other types get none.
fn to_portfolio_strategy(api: ApiBiddingStrategy) -> BidResult<PortfolioStrategy> {
    let id = match &api.id {
        Some(id) => id.parse("id")?,
        None => resource_id(&api.resource_name)?,
    };
    let strategy_type = api
        .strategy_type
        .as_deref()
        .map(StrategyType::from_api_str)
        .unwrap_or_else(|| StrategyType::Other("UNSPECIFIED".to_string()));
    let status = api
        .status
        .as_deref()
        .map(StrategyStatus::from_api_str)
        .unwrap_or(StrategyStatus::Unknown);

    let api_scheme = match strategy_type {
        StrategyType::TargetCpa => api.target_cpa,
        StrategyType::TargetSpend => api.target_spend,
        StrategyType::TargetRoas => api.target_roas,
        StrategyType::MaximizeConversions => api.maximize_conversions,
        StrategyType::TargetImpressionShare => api.target_impression_share,
        StrategyType::Other(_) => None,
    };

    let scheme = if scheme_field(&strategy_type).is_some() {
        let raw = api_scheme.unwrap_or_default();
        Some(BiddingScheme {
            bid_ceiling: raw
                .cpc_bid_ceiling_micros
                .map(|v| v.parse("cpcBidCeilingMicros").map(Micros))
                .transpose()?,
            target_cpa: raw
                .target_cpa_micros
                .map(|v| v.parse("targetCpaMicros").map(Micros))
                .transpose()?,
        })
    } else {
        None
    };

    Ok(PortfolioStrategy {
        id,
        resource_name: api.resource_name,
        name: api.name,
        status,
        strategy_type,
        scheme,
    })
}

/// Trailing id of a resource name like `customers/1/biddingStrategies/42`.
fn resource_id(resource_name: &str) -> BidResult<i64> {
    resource_name
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            BidError::service(SERVICE_NAME, format!("no id in resource name {resource_name:?}"))
        })
}

/// Build the mutate request body for one strategy update.
///
/// The update mask always names the ceiling, so an absent ceiling clears
/// it remotely. The target is only masked when present.
fn build_mutate_body(update: &PortfolioStrategy) -> BidResult<serde_json::Value> {
    let missing = || BidError::MissingBiddingScheme {
        strategy: update.name.clone(),
    };
    let scheme = update.scheme.as_ref().ok_or_else(missing)?;
    let (path, key) = scheme_field(&update.strategy_type).ok_or_else(missing)?;

    let mut scheme_json = serde_json::Map::new();
    let mut mask = vec![format!("{path}.cpc_bid_ceiling_micros")];

    if let Some(ceiling) = scheme.bid_ceiling {
        scheme_json.insert(
            "cpcBidCeilingMicros".to_string(),
            serde_json::Value::String(ceiling.0.to_string()),
        );
    }
    if update.strategy_type.has_target_cpa() {
        if let Some(target) = scheme.target_cpa {
            scheme_json.insert(
                "targetCpaMicros".to_string(),
                serde_json::Value::String(target.0.to_string()),
            );
            mask.push(format!("{path}.target_cpa_micros"));
        }
    }

    let mut operand = serde_json::Map::new();
    operand.insert(
        "resourceName".to_string(),
        serde_json::Value::String(update.resource_name.clone()),
    );
    operand.insert(key.to_string(), serde_json::Value::Object(scheme_json));

    Ok(serde_json::json!({
        "operations": [{
            "updateMask": mask.join(","),
            "update": operand,
        }]
    }))
}

/// Strip dashes from a customer id as shown in the UI (`123-456-7890`).
pub fn normalize_customer_id(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_digit()).collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Ads bidding strategy client.
pub struct GoogleAdsClient {
    http: Client,
    settings: GoogleAdsSettings,
}

impl GoogleAdsClient {
    pub fn new(settings: GoogleAdsSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent("bid-adjuster/0.1.0")
            .build()
            .context("Failed to build HTTP client for Google Ads")?;

        Ok(Self { http, settings })
    }

    /// Build a client from the application config, resolving secrets from
    /// the environment.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let developer_token = AppConfig::resolve_env(&cfg.account.developer_token_env)?;
        let access_token = AppConfig::resolve_env(&cfg.account.access_token_env)?;

        Self::new(GoogleAdsSettings {
            base_url: cfg.api.base_url.trim_end_matches('/').to_string(),
            version: cfg.api.version.clone(),
            customer_id: normalize_customer_id(&cfg.account.customer_id),
            login_customer_id: cfg
                .account
                .login_customer_id
                .as_deref()
                .map(normalize_customer_id),
            developer_token: Secret::new(developer_token),
            access_token: Secret::new(access_token),
            timeout: Duration::from_secs(cfg.api.timeout_secs),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/customers/{}/{method}",
            self.settings.base_url, self.settings.version, self.settings.customer_id
        )
    }

    /// POST a JSON body with auth headers and decode the JSON response.
    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> BidResult<T> {
        let url = self.endpoint(method);
        debug!(url = %url, "Google Ads request");

        let mut req = self
            .http
            .post(&url)
            .bearer_auth(self.settings.access_token.expose_secret())
            .header("developer-token", self.settings.developer_token.expose_secret())
            .json(body);
        if let Some(login) = &self.settings.login_customer_id {
            req = req.header("login-customer-id", login);
        }

        let resp = req.send().await.map_err(|e| {
            BidError::service(SERVICE_NAME, format!("{method} request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BidError::service(
                SERVICE_NAME,
                format!("{method} error {status}: {body}"),
            ));
        }

        resp.json().await.map_err(|e| {
            BidError::service(SERVICE_NAME, format!("failed to parse {method} response: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// BiddingStrategyService trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl BiddingStrategyService for GoogleAdsClient {
    async fn fetch(&self, selector: &StrategySelector) -> BidResult<Vec<PortfolioStrategy>> {
        let query = build_query(selector);
        debug!(query = %query, "Fetching bidding strategies");

        let resp: SearchResponse = self
            .post("googleAds:search", &serde_json::json!({ "query": query }))
            .await?;

        let strategies = resp
            .results
            .into_iter()
            .map(|row| to_portfolio_strategy(row.bidding_strategy))
            .collect::<BidResult<Vec<_>>>()?;

        info!(count = strategies.len(), "Bidding strategies fetched");
        Ok(strategies)
    }

    async fn submit(&self, update: &PortfolioStrategy) -> BidResult<()> {
        let body = build_mutate_body(update)?;
        let resp: MutateResponse = self.post("biddingStrategies:mutate", &body).await?;

        let resource = resp
            .results
            .first()
            .map(|r| r.resource_name.as_str())
            .unwrap_or(update.resource_name.as_str());
        debug!(resource = %resource, strategy_id = update.id, "Bidding strategy updated");
        Ok(())
    }

    fn name(&self) -> &str {
        SERVICE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
