//! Product page fetching with degrade-to-placeholder semantics.
//!
//! [`ProductFetcher::fetch_listing`] never fails: anti-bot blocks, missing
//! pages, timeouts and non-product pages all resolve to a deterministic
//! placeholder listing so the rest of the pipeline stays usable offline.

use std::time::Duration;

use listingforge_shared::{
    Asin, ListingForgeError, ProductListing, Result, ScraperConfig, parse_base_url,
};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extract::extract_listing;

const PLACEHOLDER_TITLE_PREFIX: &str = "Premium Wireless Bluetooth Headphones";

const PLACEHOLDER_BULLETS: [&str; 5] = [
    "Advanced Active Noise Cancellation (ANC) technology blocks out ambient noise for immersive listening experience",
    "40-hour battery life with quick charge feature - 5 minutes of charging provides 2 hours of playback",
    "Premium sound quality with 40mm drivers delivering deep bass and crystal-clear highs",
    "Comfortable over-ear design with memory foam cushions for all-day wear",
    "Universal compatibility with Bluetooth 5.0 - works with all smartphones, tablets, and laptops",
];

const PLACEHOLDER_DESCRIPTION: &str = "Experience superior audio quality with our Premium Wireless Bluetooth Headphones. \
Featuring advanced Active Noise Cancellation technology, these headphones create an immersive listening environment by blocking out unwanted ambient noise. \
The 40mm drivers deliver exceptional sound quality with deep, powerful bass and crystal-clear treble. \
With an impressive 40-hour battery life and quick charge capability, you can enjoy your music all day long. \
The comfortable over-ear design with memory foam cushions ensures maximum comfort during extended listening sessions. \
Perfect for music lovers, professionals, and anyone seeking high-quality wireless audio.";

// ---------------------------------------------------------------------------
// ScrapeFailure
// ---------------------------------------------------------------------------

/// Why a live scrape did not produce a listing. Logged, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeFailure {
    /// Bot detection (403, 405, 503).
    #[error("request blocked (HTTP {0})")]
    Blocked(u16),

    #[error("product page not found (HTTP 404)")]
    NotFound,

    #[error("unexpected HTTP {0}")]
    HttpStatus(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("body read failed: {0}")]
    Body(String),

    /// The page loaded but had no product title.
    #[error("not a product page: {0}")]
    NotAProductPage(String),
}

impl ScrapeFailure {
    fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            403 | 405 | 503 => Self::Blocked(status.as_u16()),
            404 => Self::NotFound,
            other => Self::HttpStatus(other),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ProductFetcher
// ---------------------------------------------------------------------------

/// Fetches product pages with a browser-like client.
#[derive(Debug, Clone)]
pub struct ProductFetcher {
    client: Client,
    base_url: Url,
}

impl ProductFetcher {
    /// Build the HTTP client from config. This is the only fallible step.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url).map_err(|e| {
            ListingForgeError::config(format!("invalid scraper base_url '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ListingForgeError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, base_url })
    }

    /// Canonical product page URL for an ASIN.
    pub fn product_url(&self, asin: &Asin) -> Result<Url> {
        self.base_url
            .join(&format!("dp/{asin}"))
            .map_err(|e| ListingForgeError::parse(format!("cannot build product URL: {e}")))
    }

    /// Fetch and extract a listing, degrading to placeholder data on any failure.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn fetch_listing(&self, asin: &Asin) -> ProductListing {
        match self.scrape(asin).await {
            Ok(listing) => {
                info!(bullets = listing.bullets.len(), "scraped product page");
                listing
            }
            Err(failure) => {
                match &failure {
                    ScrapeFailure::Blocked(status) => {
                        warn!(status, "store blocked request, using placeholder listing")
                    }
                    ScrapeFailure::NotFound => {
                        warn!("ASIN not found, using placeholder listing")
                    }
                    ScrapeFailure::Timeout => warn!("request timed out, using placeholder listing"),
                    other => warn!(error = %other, "scrape failed, using placeholder listing"),
                }
                placeholder_listing(asin)
            }
        }
    }

    async fn scrape(&self, asin: &Asin) -> std::result::Result<ProductListing, ScrapeFailure> {
        let url = self
            .product_url(asin)
            .map_err(|e| ScrapeFailure::Network(e.to_string()))?;
        debug!(%url, "fetching product page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(ScrapeFailure::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeFailure::from_status(status));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeFailure::Timeout
            } else {
                ScrapeFailure::Body(e.to_string())
            }
        })?;

        extract_listing(asin, &body).map_err(|e| ScrapeFailure::NotAProductPage(e.to_string()))
    }
}

/// Headers a desktop browser sends on a top-level navigation.
///
/// `Accept-Encoding` is left to reqwest so it can decompress the body.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

/// Deterministic stand-in listing used whenever a live scrape fails.
///
/// A 404 lands here too, so an ASIN that does not exist is indistinguishable
/// from a blocked one downstream.
pub fn placeholder_listing(asin: &Asin) -> ProductListing {
    ProductListing {
        asin: asin.clone(),
        title: format!("{PLACEHOLDER_TITLE_PREFIX} - {asin}"),
        bullets: PLACEHOLDER_BULLETS.iter().map(|b| (*b).to_string()).collect(),
        description: PLACEHOLDER_DESCRIPTION.to_string(),
    }
}

#[cfg(test)]
mod fetch_tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ASIN: &str = "B07H65KP63";

    fn asin() -> Asin {
        Asin::parse(ASIN).unwrap()
    }

    fn fetcher_for(base_url: &str, timeout_secs: u64) -> ProductFetcher {
        let config = ScraperConfig {
            base_url: base_url.to_string(),
            timeout_secs,
            ..ScraperConfig::default()
        };
        ProductFetcher::new(&config).unwrap()
    }

    const PRODUCT_PAGE: &str = r#"<html><body>
        <span id="productTitle">
            Acme Stainless Steel Electric Kettle, 1.7L
        </span>
        <div id="feature-bullets"><ul>
            <li><span class="a-list-item">Boils water in under four minutes</span></li>
            <li><span class="a-list-item">Auto shut-off and boil-dry protection</span></li>
        </ul></div>
        <div id="productDescription"><p>A kettle for every kitchen.</p></div>
    </body></html>"#;

    #[test]
    fn product_url_is_canonical() {
        let fetcher = fetcher_for("https://www.amazon.com", 15);
        let url = fetcher.product_url(&asin()).unwrap();
        assert_eq!(url.as_str(), "https://www.amazon.com/dp/B07H65KP63");
    }

    #[test]
    fn product_url_keeps_base_path() {
        let fetcher = fetcher_for("https://proxy.example/amazon", 15);
        let url = fetcher.product_url(&asin()).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/amazon/dp/B07H65KP63");
    }

    #[test]
    fn placeholder_shape() {
        let listing = placeholder_listing(&asin());
        assert_eq!(listing.title, "Premium Wireless Bluetooth Headphones - B07H65KP63");
        assert_eq!(listing.bullets.len(), 5);
        assert!(listing.description.starts_with("Experience superior audio quality"));
        assert!(listing.description.chars().count() <= 2003);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let config = ScraperConfig {
            base_url: "not a url".into(),
            ..ScraperConfig::default()
        };
        let err = ProductFetcher::new(&config).unwrap_err();
        assert!(err.to_string().contains("invalid scraper base_url"));
    }

    #[tokio::test]
    async fn scrapes_live_page_with_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dp/B07H65KP63"))
            .and(headers("accept-language", vec!["en-US", "en;q=0.9"]))
            .and(header_eq("sec-fetch-mode", "navigate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let listing = fetcher_for(&server.uri(), 5).fetch_listing(&asin()).await;
        assert_eq!(listing.title, "Acme Stainless Steel Electric Kettle, 1.7L");
        assert_eq!(listing.bullets.len(), 2);
        assert_eq!(listing.description, "A kettle for every kitchen.");
    }

    #[tokio::test]
    async fn blocked_response_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Robot check"))
            .mount(&server)
            .await;

        let listing = fetcher_for(&server.uri(), 5).fetch_listing(&asin()).await;
        assert_eq!(listing, placeholder_listing(&asin()));
    }

    #[tokio::test]
    async fn not_found_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let listing = fetcher_for(&server.uri(), 5).fetch_listing(&asin()).await;
        assert_eq!(listing, placeholder_listing(&asin()));
    }

    #[tokio::test]
    async fn page_without_title_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><form action=\"/errors/validateCaptcha\"></form></body></html>"),
            )
            .mount(&server)
            .await;

        let listing = fetcher_for(&server.uri(), 5).fetch_listing(&asin()).await;
        assert_eq!(listing, placeholder_listing(&asin()));
    }

    #[tokio::test]
    async fn timeout_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PRODUCT_PAGE)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let listing = fetcher_for(&server.uri(), 1).fetch_listing(&asin()).await;
        assert_eq!(listing, placeholder_listing(&asin()));
    }

    #[tokio::test]
    async fn connection_refused_degrades() {
        // Port 9 (discard) on loopback is closed in test environments.
        let listing = fetcher_for("http://127.0.0.1:9", 2).fetch_listing(&asin()).await;
        assert_eq!(listing.title, "Premium Wireless Bluetooth Headphones - B07H65KP63");
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            ScrapeFailure::from_status(StatusCode::FORBIDDEN),
            ScrapeFailure::Blocked(403)
        ));
        assert!(matches!(
            ScrapeFailure::from_status(StatusCode::METHOD_NOT_ALLOWED),
            ScrapeFailure::Blocked(405)
        ));
        assert!(matches!(
            ScrapeFailure::from_status(StatusCode::NOT_FOUND),
            ScrapeFailure::NotFound
        ));
        assert!(matches!(
            ScrapeFailure::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            ScrapeFailure::HttpStatus(500)
        ));
    }
}
