use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::MetadataSource;
use crate::MetadataRecord;
use crate::rate_limit::{SourceError, check_rate_limit_response};

/// CrossRef works API backend.
pub struct CrossRef {
    /// Contact email; registering one routes requests to the polite pool.
    pub mailto: Option<String>,
}

impl MetadataSource for CrossRef {
    fn name(&self) -> &str {
        "CrossRef"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        max_results: usize,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MetadataRecord>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let mut url = format!(
                "https://api.crossref.org/works?query={}&rows={}&sort=relevance",
                urlencoding::encode(query),
                max_results
            );

            let user_agent = if let Some(ref email) = self.mailto {
                url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
                format!("BibliographyChecker/0.2 (mailto:{})", email)
            } else {
                "BibliographyChecker/0.2".to_string()
            };

            let resp = client
                .get(&url)
                .header("User-Agent", user_agent)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| SourceError::Other(e.to_string()))?;

            check_rate_limit_response(&resp)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SourceError::Other(format!("HTTP {}", status)));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| SourceError::Other(e.to_string()))?;
            let items = data["message"]["items"]
                .as_array()
                .cloned()
                .unwrap_or_default();

            Ok(items.iter().map(parse_work).collect())
        })
    }
}

/// Map one CrossRef work object onto a [`MetadataRecord`].
fn parse_work(item: &serde_json::Value) -> MetadataRecord {
    // Titles come back as a list of segments; join them with spaces.
    let title = item["title"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    // Keep the first three authors as "Family, Given", family alone when
    // no given name is present.
    let authors: Vec<String> = item["author"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .take(3)
                .filter_map(|a| {
                    let family = a["family"].as_str()?;
                    Some(match a["given"].as_str() {
                        Some(given) => format!("{}, {}", family, given),
                        None => family.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // Prefer the print date over the online date.
    let year = ["published-print", "published-online"]
        .iter()
        .find_map(|key| item[*key]["date-parts"][0][0].as_i64().map(|y| y.to_string()));

    let journal = item["container-title"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let doi = item["DOI"].as_str().unwrap_or("").to_string();

    MetadataRecord {
        title,
        authors,
        year,
        journal,
        doi,
        source_name: "CrossRef".to_string(),
    }
}
