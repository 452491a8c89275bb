use crate::UrlError;
use url::Url;

/// Schemes that are never followed, checked before resolution so that
/// `javascript:void(0)` style links are rejected without a parse attempt
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves an extracted `href` against the page it was found on
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty hrefs
/// 2. Reject fragment-only links (`#section`), they point back at `base`
/// 3. Reject `javascript:`, `mailto:`, `tel:` and `data:` links
/// 4. Resolve relative references against `base`
/// 5. Require an `http`/`https` scheme and a host
/// 6. Drop the fragment so `page#a` and `page#b` share one identity
///
/// Host case and percent-encoding are normalized by the `url` crate itself.
/// Nothing else is rewritten: exact-URL identity is the crawl's only
/// deduplication rule.
///
/// # Examples
///
/// ```
/// use depthcrawl::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/docs/index.html").unwrap();
/// let url = normalize_link("../about#team", &base).unwrap();
/// assert_eq!(url.as_str(), "http://a.test/about");
/// ```
pub fn normalize_link(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    if href.starts_with('#') {
        return Err(UrlError::FragmentOnly(href.to_string()));
    }

    let lowered = href.to_ascii_lowercase();
    if let Some(scheme) = SKIPPED_SCHEMES.iter().find(|s| lowered.starts_with(*s)) {
        return Err(UrlError::InvalidScheme(scheme.trim_end_matches(':').to_string()));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    finish(resolved)
}

/// Parses the crawl's seed URL
///
/// The seed must already be absolute; it goes through the same scheme, host
/// and fragment rules as extracted links.
pub fn parse_seed(seed: &str) -> Result<Url, UrlError> {
    let seed = seed.trim();
    if seed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url = Url::parse(seed).map_err(|e| UrlError::Parse(format!("{}: {}", seed, e)))?;
    finish(url)
}

/// Returns true if both URLs name the same host (port ignored)
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn finish(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}
