//! Typed errors for the transport and extraction layer

use thiserror::Error;

/// Failures that can surface while fetching or dissecting a page.
///
/// Extraction misses are deliberately not represented here; an absent
/// field is a valid outcome, not an error.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("invalid CSS selector '{selector}'")]
    InvalidSelector { selector: String },

    #[error("scrape cancelled")]
    Cancelled,
}
