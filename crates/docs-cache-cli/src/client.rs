#![deny(clippy::all, clippy::pedantic)]

use docs_cache_api_types::InvalidateCacheRequest;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use crate::args::Cli;

const INVALIDATE_PATH: &str = "cache/invalidate";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or DOCS_CACHE_SITE_URL)")]
    MissingSite,
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
}

impl Ctx {
    pub fn new(site: &str) -> Result<Self, CliError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("docs-cache-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    /// Ask the server to drop `keys`.
    ///
    /// The server answers 204 only when every key was invalidated; it does
    /// not say which keys failed otherwise.
    pub async fn invalidate(&self, keys: Vec<String>) -> Result<(), CliError> {
        let request = InvalidateCacheRequest::new(keys);
        if request.is_empty() {
            return Err(CliError::InvalidInput("at least one key is required".into()));
        }

        let resp = self
            .client
            .post(self.url(INVALIDATE_PATH)?)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::NO_CONTENT {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(())
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.as_deref().ok_or(CliError::MissingSite)?;
    Ctx::new(site)
}
