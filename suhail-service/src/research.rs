//! Company research through the Google Custom Search JSON API.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const PREFERRED_DOMAINS: [&str; 4] = ["wikipedia.org", "linkedin.com", "crunchbase.com", "bloomberg.com"];
const DEFAULT_RESULTS: u8 = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub domain: String,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompanyInsight {
    pub one_liner: String,
    pub results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Clone)]
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    cse_id: String,
}

impl GoogleSearch {
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }

    /// `None` unless both credentials are configured.
    pub fn from_keys(api_key: Option<&str>, cse_id: Option<&str>) -> Option<Self> {
        match (api_key, cse_id) {
            (Some(key), Some(cse)) => Some(Self::new(key, cse)),
            _ => None,
        }
    }

    pub async fn company_insight(&self, company_name: &str) -> anyhow::Result<CompanyInsight> {
        let query = format!("{} company overview", company_name.trim());
        info!(query = %query, "Searching company information");

        let num = DEFAULT_RESULTS.to_string();
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query.as_str()),
                ("num", num.as_str()),
                ("hl", "en"),
                ("gl", "us"),
                ("safe", "active"),
            ])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Company search failed");
            return Err(anyhow::anyhow!("Search request failed with status {}", response.status()));
        }

        let body: SearchResponse = response.json().await?;
        let results = to_results(body.items);
        Ok(CompanyInsight {
            one_liner: one_liner(&results),
            results,
        })
    }
}

fn to_results(items: Vec<SearchItem>) -> Vec<SearchResult> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| SearchResult {
            title: item.title.trim().to_string(),
            domain: domain_of(&item.link),
            link: item.link,
            snippet: item.snippet.trim().to_string(),
            rank: i + 1,
        })
        .collect()
}

/// Registered domain of a URL: `https://en.wikipedia.org/wiki/X` → `wikipedia.org`.
pub fn domain_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return String::new();
    }
    labels[labels.len() - 2..].join(".")
}

/// First sentence of a snippet, or empty when it is too short to be useful.
pub fn first_sentence(snippet: &str) -> String {
    let first = snippet.trim().split('.').next().unwrap_or_default();
    let trimmed = first.trim_matches(|c: char| "–—-:;()[] ".contains(c));
    if trimmed.chars().count() > 20 {
        trimmed.to_string()
    } else {
        String::new()
    }
}

/// Prefer a sentence from a reference site, then any result.
pub fn one_liner(results: &[SearchResult]) -> String {
    results
        .iter()
        .filter(|r| PREFERRED_DOMAINS.contains(&r.domain.as_str()))
        .chain(results.iter())
        .map(|r| first_sentence(&r.snippet))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(link: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: String::new(),
            link: link.to_string(),
            snippet: snippet.to_string(),
            domain: domain_of(link),
            rank: 1,
        }
    }

    #[test]
    fn extracts_registered_domain() {
        assert_eq!(domain_of("https://en.wikipedia.org/wiki/Saudi_Aramco"), "wikipedia.org");
        assert_eq!(domain_of("https://www.linkedin.com/company/acme?x=1"), "linkedin.com");
        assert_eq!(domain_of("http://user@crunchbase.com:8080/org"), "crunchbase.com");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn first_sentence_requires_some_substance() {
        assert_eq!(
            first_sentence("Acme Corp is a logistics company based in Riyadh. Founded 1990."),
            "Acme Corp is a logistics company based in Riyadh"
        );
        assert_eq!(first_sentence("Acme. Home."), "");
        assert_eq!(first_sentence("— (Acme Holdings is a conglomerate)"), "Acme Holdings is a conglomerate");
    }

    #[test]
    fn prefers_reference_domains() {
        let results = vec![
            result("https://acme.example.com", "Acme sells the best widgets in the whole region."),
            result("https://en.wikipedia.org/wiki/Acme", "Acme is a fictional corporation in cartoons."),
        ];
        assert_eq!(one_liner(&results), "Acme is a fictional corporation in cartoons");

        let plain = vec![result("https://acme.example.com", "Acme sells the best widgets in the whole region.")];
        assert_eq!(one_liner(&plain), "Acme sells the best widgets in the whole region");
        assert_eq!(one_liner(&[]), "");
    }

    #[test]
    fn ranks_follow_response_order() {
        let results = to_results(vec![
            SearchItem { title: " A ".into(), link: "https://a.com".into(), snippet: "x".into() },
            SearchItem { title: "B".into(), link: "https://b.org/p".into(), snippet: "y".into() },
        ]);
        assert_eq!(results[0].title, "A");
        assert_eq!(results[1].rank, 2);
        assert_eq!(results[1].domain, "b.org");
    }
}
