//! URL relevance ranking
//!
//! Search results are reordered so pages whose path looks like a leadership
//! or operations page get crawled first.

use url::Url;

/// Path fragments that suggest a leadership or board page
pub const LEADERSHIP_HINTS: &[&str] = &["board", "management", "executive", "leadership", "about"];

/// Path fragments that suggest an operations or assets page
pub const ASSET_HINTS: &[&str] = &["operation", "project", "mine", "asset", "location", "portfolio"];

/// Counts the hints found in the URL's lower-cased path
///
/// URLs that fail to parse score zero.
pub fn score_url(url: &str, hints: &[&str]) -> usize {
    let Ok(parsed) = Url::parse(url) else {
        return 0;
    };
    let path = parsed.path().to_lowercase();

    hints.iter().filter(|hint| path.contains(*hint)).count()
}

/// Orders URLs by descending score, keeping search order among equal scores
pub fn rank_urls(urls: Vec<String>, hints: &[&str]) -> Vec<String> {
    let mut scored: Vec<(usize, String)> = urls
        .into_iter()
        .map(|url| (score_url(&url, hints), url))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored.into_iter().map(|(_, url)| url).collect()
}
