use crate::config::{AppConfig, FetchConfig, FetchMode, VenueConfig};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub source_url: String,
    pub body: String,
}

/// Returns the raw booking page for a date. One attempt per call.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, date: NaiveDate) -> Result<FetchedPage>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    sport_id: u32,
}

impl HttpFetcher {
    pub fn new(venue: &VenueConfig, fetch: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = &fetch.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            base_url: venue.base_url.clone(),
            sport_id: venue.sport_id,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, date: NaiveDate) -> Result<FetchedPage> {
        let url = build_availability_url(&self.base_url, date, self.sport_id)?;
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("request to {url} failed with status {status}");
        }

        let body = resp
            .text()
            .with_context(|| format!("failed to read response body from {url}"))?;
        info!(%url, bytes = body.len(), "fetched availability page");

        Ok(FetchedPage {
            source_url: url,
            body,
        })
    }
}

/// Serves a saved page for every date.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageFetcher for FileFetcher {
    fn fetch(&self, date: NaiveDate) -> Result<FetchedPage> {
        let body = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read page file {}", self.path.display()))?;

        info!(
            file = %self.path.display(),
            date = %date,
            bytes = body.len(),
            "loaded page from file"
        );

        Ok(FetchedPage {
            source_url: format!("file://{}", self.path.display()),
            body,
        })
    }
}

/// `None` when fetching is disabled.
pub fn fetcher_from_config(config: &AppConfig) -> Result<Option<Box<dyn PageFetcher>>> {
    match config.fetch.mode {
        FetchMode::Http => Ok(Some(Box::new(HttpFetcher::new(
            &config.venue,
            &config.fetch,
        )?))),
        FetchMode::File => {
            let path = config
                .fetch
                .file_path
                .as_ref()
                .context("fetch.file_path missing for file mode")?;
            Ok(Some(Box::new(FileFetcher::new(path))))
        }
        FetchMode::Disabled => Ok(None),
    }
}

/// Sets `date` and `sport` on the venue URL, keeping any other query pairs.
pub fn build_availability_url(base_url: &str, date: NaiveDate, sport_id: u32) -> Result<String> {
    let mut url = Url::parse(base_url).with_context(|| format!("invalid base_url {base_url}"))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "date" && k != "sport")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push(("date".to_string(), date.format("%Y-%m-%d").to_string()));
    pairs.push(("sport".to_string(), sport_id.to_string()));

    {
        let mut qp = url.query_pairs_mut();
        qp.clear();
        for (k, v) in pairs {
            qp.append_pair(&k, &v);
        }
    }

    Ok(url.to_string())
}
