//! Content identity helpers: the deduplication hash and URL normalisation.
//!
//! Two documents with the same text hash are the same source, regardless of
//! where they were fetched from.

use sha2::{Digest, Sha256};
use url::Url;

/// Lowercase hex SHA-256 of `text`, used as `source.hash`.
pub fn content_hash(text: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(text.as_bytes());
  hex::encode(hasher.finalize())
}

/// Canonical form of a URL for storage and comparison.
///
/// Drops the fragment, strips trailing slashes from the path and sorts query
/// parameters. Input that does not parse as an absolute URL is returned
/// unchanged.
pub fn normalize_url(raw: &str) -> String {
  let Ok(mut url) = Url::parse(raw.trim()) else {
    return raw.to_owned();
  };

  url.set_fragment(None);

  let path = url.path().trim_end_matches('/').to_owned();
  url.set_path(&path);

  let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
  if pairs.is_empty() {
    url.set_query(None);
  } else {
    pairs.sort();
    url.query_pairs_mut().clear().extend_pairs(&pairs);
  }

  url.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_sha256_hex() {
    assert_eq!(
      content_hash(""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(content_hash("abc").len(), 64);
  }

  #[test]
  fn hash_distinguishes_content() {
    assert_ne!(content_hash("net sales up"), content_hash("net sales down"));
    assert_eq!(content_hash("same"), content_hash("same"));
  }

  #[test]
  fn normalize_sorts_query_and_drops_fragment() {
    assert_eq!(
      normalize_url("https://Example.com/media/news/?b=2&a=1#top"),
      "https://example.com/media/news?a=1&b=2"
    );
  }

  #[test]
  fn normalize_is_idempotent() {
    let once = normalize_url("https://example.com/a/b/?z=1&y=2");
    assert_eq!(normalize_url(&once), once);
  }

  #[test]
  fn normalize_root_path() {
    assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
  }

  #[test]
  fn unparseable_input_is_kept() {
    assert_eq!(normalize_url("not a url"), "not a url");
    assert_eq!(normalize_url("/relative/path/"), "/relative/path/");
  }
}
