//! Client for the 500px photo-search API.
//!
//! A query becomes one GET against `v1/photos/search`; the response is parsed
//! into [`PhotoRecord`]s with malformed entries dropped rather than failing
//! the batch, then filtered by upload date when the query asks for it. The
//! network call and parsing run on the blocking pool; the outcome callback is
//! invoked from there and is expected to marshal onto the coordination
//! context itself.

use log::{debug, info, warn};
use serde::Deserialize;
use ureq::http::Uri;

use crate::config::Config;
use crate::search_types::{
    OutcomeCallback, PhotoFinder, PhotoRecord, SearchError, SearchOutcome, SearchQuery,
};

const API_METHOD: &str = "v1/photos/search";

const LICENSE_CREATIVE_COMMONS: &str = "1,2,3,4,5,6";
const LICENSE_ANY: &str = "0";

// Fixed wire format; chrono's parser is locale-free by construction.
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

pub struct SearchClient {
    agent: ureq::Agent,
    api_host: String,
    api_key: String,
    image_size: String,
}

impl SearchClient {
    pub fn new(config: &Config) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_host: config.api_host.clone(),
            api_key: config.api_key.clone(),
            image_size: config.image_size.clone(),
        }
    }

    fn request_url(&self, query: &SearchQuery) -> Result<String, SearchError> {
        let params = [
            ("consumer_key", self.api_key.as_str()),
            ("image_size", self.image_size.as_str()),
            ("term", query.text.as_str()),
            ("license_type", license_code(query.creative_commons_only)),
        ];
        let querystring = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}{}?{}", self.api_host, API_METHOD, querystring);
        url.parse::<Uri>()
            .map_err(|_| SearchError::MalformedRequest)?;
        Ok(url)
    }
}

impl PhotoFinder for SearchClient {
    fn find(&self, query: SearchQuery, deliver: OutcomeCallback) -> Result<(), SearchError> {
        let url = self.request_url(&query)?;
        info!("Searching photos for '{}'", query.text);
        debug!("Request URL: {}", url);

        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = perform_search(&agent, &url, &query);
            match &outcome {
                Ok(records) => info!(
                    "Search for '{}' returned {} photos",
                    query.text,
                    records.len()
                ),
                Err(error) => warn!("Search for '{}' failed: {}", query.text, error),
            }
            deliver(outcome);
        });
        Ok(())
    }
}

fn license_code(creative_commons_only: bool) -> &'static str {
    if creative_commons_only {
        LICENSE_CREATIVE_COMMONS
    } else {
        LICENSE_ANY
    }
}

fn perform_search(agent: &ureq::Agent, url: &str, query: &SearchQuery) -> SearchOutcome {
    // ureq reports non-2xx statuses as errors, so both connect failures and
    // HTTP-level failures land in the transport bucket.
    let mut response = agent
        .get(url)
        .call()
        .map_err(|error| SearchError::Transport(error.to_string()))?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|error| SearchError::Transport(error.to_string()))?;
    let records = parse_search_results(&body)?;
    Ok(filter_by_date(records, query))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    name: Option<String>,
    image_url: Option<String>,
    created_at: Option<String>,
}

fn parse_search_results(body: &str) -> Result<Vec<PhotoRecord>, SearchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|_| SearchError::Parse)?;
    Ok(response.photos.into_iter().filter_map(parse_photo).collect())
}

/// Maps one `photos` entry to a record. Entries missing a field, carrying an
/// unparseable timestamp, or naming an invalid URI yield `None` and are
/// dropped from the batch without affecting their neighbours.
fn parse_photo(entry: serde_json::Value) -> Option<PhotoRecord> {
    let raw: RawPhoto = serde_json::from_value(entry).ok()?;
    let title = raw.name?;
    let image_url: Uri = raw.image_url?.parse().ok()?;
    let created_at = chrono::DateTime::parse_from_str(&raw.created_at?, CREATED_AT_FORMAT)
        .ok()?
        .with_timezone(&chrono::Utc);
    Some(PhotoRecord {
        title,
        image_url,
        created_at,
    })
}

fn filter_by_date(records: Vec<PhotoRecord>, query: &SearchQuery) -> Vec<PhotoRecord> {
    if !query.date_filter_enabled {
        return records;
    }
    records
        .into_iter()
        .filter(|record| record.created_at > query.min_date && record.created_at < query.max_date)
        .collect()
}
