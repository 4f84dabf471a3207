//! Product page extraction policy.
//!
//! Each field is produced by an ordered list of strategies
//! (`fn(&Html) -> Option<T>`); the first strategy that yields a value wins,
//! and every field except the title ends in a synthesized fallback.

use std::sync::LazyLock;

use listingforge_shared::{Asin, ListingForgeError, ProductListing, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Maximum bullets kept from a page.
pub const MAX_BULLETS: usize = 5;

/// Maximum description length in characters before truncation.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Appended to a truncated description.
pub const ELLIPSIS: &str = "...";

/// Bullet text containing this marker is expand/collapse chrome, not content.
const SEE_MORE: &str = "See more";

/// Substituted when neither bullet strategy finds anything.
pub const FILLER_BULLETS: [&str; MAX_BULLETS] = [
    "High-quality product with excellent features",
    "Durable construction and reliable performance",
    "Easy to use and maintain",
    "Great value for money",
    "Customer satisfaction guaranteed",
];

const DESCRIPTION_SUFFIX: &str = ". This product offers excellent quality and value. \
     Perfect for customers looking for reliable performance and durability.";

type Strategy<T> = fn(&Html) -> Option<T>;

const TITLE_STRATEGIES: &[Strategy<String>] = &[title_by_id, title_by_span];
const BULLET_STRATEGIES: &[Strategy<Vec<String>>] = &[feature_list_items, feature_bullets_loose];
const DESCRIPTION_STRATEGIES: &[Strategy<String>] = &[
    description_paragraphs,
    description_container,
    description_aplus,
];

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("#productTitle"));
static TITLE_SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span#productTitle"));
static BULLET_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| selector("#feature-bullets ul li span.a-list-item"));
static BULLET_LI: LazyLock<Selector> = LazyLock::new(|| selector("div#feature-bullets li"));
static DESCRIPTION_P: LazyLock<Selector> = LazyLock::new(|| selector("#productDescription p"));
static DESCRIPTION_DIV: LazyLock<Selector> =
    LazyLock::new(|| selector("div#productDescription"));
static APLUS: LazyLock<Selector> = LazyLock::new(|| selector("#aplus .aplus-v2"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap_or_else(|e| panic!("invalid regex: {e}")));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract listing fields from a product page.
///
/// Fails only when no title can be found, which callers treat as "this was
/// not a product page".
pub fn extract_listing(asin: &Asin, html: &str) -> Result<ProductListing> {
    let doc = Html::parse_document(html);

    let title = first_match(&doc, TITLE_STRATEGIES)
        .ok_or_else(|| ListingForgeError::parse("Product title not found"))?;

    let mut bullets = first_match(&doc, BULLET_STRATEGIES).unwrap_or_else(filler_bullets);
    bullets.truncate(MAX_BULLETS);

    let description = first_match(&doc, DESCRIPTION_STRATEGIES)
        .unwrap_or_else(|| fallback_description(&title));

    Ok(ProductListing {
        asin: asin.clone(),
        title,
        bullets,
        description: normalize_description(&description),
    })
}

/// The fixed filler bullets, in order.
pub fn filler_bullets() -> Vec<String> {
    FILLER_BULLETS.iter().map(|b| (*b).to_string()).collect()
}

/// Description synthesized from the title when the page has none.
pub fn fallback_description(title: &str) -> String {
    format!("{title}{DESCRIPTION_SUFFIX}")
}

/// Collapse whitespace runs, trim, and cap at [`MAX_DESCRIPTION_CHARS`].
pub fn normalize_description(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw, " ");
    let collapsed = collapsed.trim();

    if collapsed.chars().count() > MAX_DESCRIPTION_CHARS {
        let mut truncated: String = collapsed.chars().take(MAX_DESCRIPTION_CHARS).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else {
        collapsed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn first_match<T>(doc: &Html, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(doc))
}

fn title_by_id(doc: &Html) -> Option<String> {
    joined_text(doc, &TITLE)
}

fn title_by_span(doc: &Html) -> Option<String> {
    joined_text(doc, &TITLE_SPAN)
}

fn feature_list_items(doc: &Html) -> Option<Vec<String>> {
    let bullets: Vec<String> = doc
        .select(&BULLET_ITEMS)
        .map(element_text)
        .filter(|text| !text.is_empty() && !text.contains(SEE_MORE))
        .collect();
    non_empty(bullets)
}

fn feature_bullets_loose(doc: &Html) -> Option<Vec<String>> {
    let bullets: Vec<String> = doc
        .select(&BULLET_LI)
        .map(element_text)
        .filter(|text| !text.contains(SEE_MORE) && text.chars().count() > 10)
        .collect();
    non_empty(bullets)
}

fn description_paragraphs(doc: &Html) -> Option<String> {
    joined_text(doc, &DESCRIPTION_P)
}

fn description_container(doc: &Html) -> Option<String> {
    joined_text(doc, &DESCRIPTION_DIV)
}

fn description_aplus(doc: &Html) -> Option<String> {
    joined_text(doc, &APLUS)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Trimmed text of one element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of every match concatenated, trimmed; `None` when empty.
fn joined_text(doc: &Html, sel: &Selector) -> Option<String> {
    let text: String = doc.select(sel).flat_map(|el| el.text()).collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
