use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::http;

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const TOOL_NAME: &str = "ncbi-fetch";

// NCBI allows 3 requests/s anonymously and 10 requests/s with an API key.
const ANONYMOUS_INTERVAL: Duration = Duration::from_millis(334);
const API_KEY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezConfig {
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub tool: String,
    pub base_url: String,
}

impl EntrezConfig {
    pub fn new(email: Option<String>, api_key: Option<String>) -> Self {
        Self {
            email,
            api_key,
            tool: TOOL_NAME.to_string(),
            base_url: EUTILS_BASE.to_string(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        if self.api_key.is_some() {
            API_KEY_INTERVAL
        } else {
            ANONYMOUS_INTERVAL
        }
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.tool.clone())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Total hits reported by NCBI; may exceed `ids.len()` when capped by retmax.
    pub count: u64,
    pub ids: Vec<String>,
}

pub trait EntrezClient {
    fn esearch(&self, db: &str, term: &str, retmax: usize) -> Result<SearchResult, FetchError>;
    /// Accession (the summary "caption") for a database UID.
    fn esummary(&self, db: &str, id: &str) -> Result<String, FetchError>;
    /// FASTA text for a database UID.
    fn efetch_fasta(&self, db: &str, id: &str) -> Result<String, FetchError>;
}

pub struct EntrezHttpClient {
    client: Client,
    config: EntrezConfig,
    last_request: Mutex<Option<Instant>>,
}

impl EntrezHttpClient {
    pub fn new(config: EntrezConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: http::build_client()?,
            config,
            last_request: Mutex::new(None),
        })
    }

    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            let interval = self.config.min_interval();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        self.throttle();
        let url = format!("{}/{endpoint}", self.config.base_url);
        let auth = self.config.auth_params();
        debug!(endpoint, "entrez request");
        http::fetch_text_with_retries("NCBI Entrez", || {
            self.client
                .get(&url)
                .query(params)
                .query(&auth)
                .timeout(http::API_TIMEOUT)
        })
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        let text = self.get(endpoint, params)?;
        serde_json::from_str(&text).map_err(|err| FetchError::EntrezResponse(err.to_string()))
    }
}

impl EntrezClient for EntrezHttpClient {
    fn esearch(&self, db: &str, term: &str, retmax: usize) -> Result<SearchResult, FetchError> {
        let payload = self.get_json(
            "esearch.fcgi",
            &[
                ("db", db.to_string()),
                ("term", term.to_string()),
                ("retmax", retmax.to_string()),
                ("retmode", "json".to_string()),
            ],
        )?;
        parse_esearch(&payload)
    }

    fn esummary(&self, db: &str, id: &str) -> Result<String, FetchError> {
        let payload = self.get_json(
            "esummary.fcgi",
            &[
                ("db", db.to_string()),
                ("id", id.to_string()),
                ("retmode", "json".to_string()),
            ],
        )?;
        parse_esummary_caption(&payload, id)
    }

    fn efetch_fasta(&self, db: &str, id: &str) -> Result<String, FetchError> {
        self.get(
            "efetch.fcgi",
            &[
                ("db", db.to_string()),
                ("id", id.to_string()),
                ("rettype", "fasta".to_string()),
                ("retmode", "text".to_string()),
            ],
        )
    }
}

pub fn parse_esearch(payload: &Value) -> Result<SearchResult, FetchError> {
    let result = &payload["esearchresult"];
    if let Some(message) = result["ERROR"].as_str().or_else(|| payload["error"].as_str()) {
        return Err(FetchError::EntrezResponse(message.to_string()));
    }
    let ids = result["idlist"]
        .as_array()
        .ok_or_else(|| FetchError::EntrezResponse("esearch response has no idlist".to_string()))?
        .iter()
        .filter_map(|value| value.as_str().map(|s| s.to_string()))
        .collect();
    let count = match &result["count"] {
        Value::String(count) => count.parse().unwrap_or_default(),
        Value::Number(count) => count.as_u64().unwrap_or_default(),
        _ => 0,
    };
    Ok(SearchResult { count, ids })
}

pub fn parse_esummary_caption(payload: &Value, id: &str) -> Result<String, FetchError> {
    let doc = &payload["result"][id];
    if let Some(message) = doc["error"].as_str() {
        return Err(FetchError::EntrezResponse(format!("{id}: {message}")));
    }
    doc["caption"]
        .as_str()
        .filter(|caption| !caption.is_empty())
        .map(|caption| caption.to_string())
        .ok_or_else(|| FetchError::EntrezResponse(format!("no caption in summary for {id}")))
}
