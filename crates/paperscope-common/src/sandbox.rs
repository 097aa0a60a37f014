use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::SearchError;

/// Bound on TCP/TLS connection setup. The overall request deadline is
/// applied per source by the caller, so it is not fixed here.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// An allowlist-capped HTTP client: requests are only permitted to the
/// approved corpus hosts, so a misrouted adapter cannot reach anywhere
/// else on the network.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of literature and
    /// grant database hosts.
    pub fn new() -> Result<Self, SearchError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "eutils.ncbi.nlm.nih.gov",  // PubMed E-utilities
            "export.arxiv.org",         // arXiv Atom API
            "api.biorxiv.org",          // bioRxiv / medRxiv
            "api.semanticscholar.org",  // Semantic Scholar Graph API
            "api.reporter.nih.gov",     // NIH RePORTER
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current allowlist.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{allowed}")) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SearchError> {
        if !self.is_allowed(url) {
            return Err(SearchError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {url}"
            )));
        }

        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, SearchError> {
        if !self.is_allowed(url) {
            return Err(SearchError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {url}"
            )));
        }

        Ok(self.client.post(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlisted_hosts_pass() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi"));
        assert!(client.is_allowed("https://export.arxiv.org/api/query?search_query=all:eeg"));
        assert!(client.is_allowed("https://api.reporter.nih.gov/v2/projects/search"));
    }

    #[test]
    fn test_unlisted_hosts_rejected() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://example.com/"));
        assert!(client.get("https://example.com/").is_err());
    }

    #[test]
    fn test_allow_domain_extends_list() {
        let mut client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://www.research.gov/awardapi-service"));
        client.allow_domain("www.research.gov");
        assert!(client.is_allowed("https://www.research.gov/awardapi-service"));
    }
}
