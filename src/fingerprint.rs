//! Change-detection fingerprint for documentation records.

use sha2::{Digest, Sha256};

use crate::models::DocumentRecord;

/// SHA-256 over `content_raw`, `title`, `platform_slug` and `excerpt`,
/// concatenated in that order with no separator, as lowercase hex.
///
/// The concatenation is not injective across field boundaries. That is
/// fine: a fingerprint is only ever compared with the previous fingerprint
/// of the same `source_file`.
pub fn fingerprint(content_raw: &str, title: &str, platform_slug: &str, excerpt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_raw.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(platform_slug.as_bytes());
    hasher.update(excerpt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a record. `filesize`, `timestamp`, `slug` and `force` do
/// not participate.
pub fn record_fingerprint(record: &DocumentRecord) -> String {
    fingerprint(
        &record.content_raw,
        &record.title,
        &record.platform_slug,
        &record.excerpt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DocumentRecord {
        DocumentRecord {
            source_file: "guide.md".to_string(),
            title: "Guide".to_string(),
            content_raw: "# Guide\n\n## Setup\n...".to_string(),
            platform_slug: "ios".to_string(),
            filesize: 120,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            force: false,
            slug: "guide".to_string(),
            excerpt: "A guide.".to_string(),
        }
    }

    #[test]
    fn test_matches_digest_of_concatenation() {
        let mut hasher = Sha256::new();
        hasher.update("# Guide\n\n## Setup\n...GuideiosA guide.".as_bytes());
        let expected = hex::encode(hasher.finalize());
        assert_eq!(record_fingerprint(&record()), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_ignores_non_content_fields() {
        let base = record_fingerprint(&record());
        let mut other = record();
        other.filesize = 9999;
        other.timestamp = "2030-06-01T12:00:00Z".to_string();
        other.slug = "renamed".to_string();
        other.force = true;
        other.source_file = "elsewhere.md".to_string();
        assert_eq!(record_fingerprint(&other), base);
    }

    #[test]
    fn test_each_content_field_changes_fingerprint() {
        let base = record_fingerprint(&record());

        let mut r = record();
        r.content_raw.push('!');
        assert_ne!(record_fingerprint(&r), base);

        let mut r = record();
        r.title = "Guide 2".to_string();
        assert_ne!(record_fingerprint(&r), base);

        let mut r = record();
        r.platform_slug = "android".to_string();
        assert_ne!(record_fingerprint(&r), base);

        let mut r = record();
        r.excerpt = String::new();
        assert_ne!(record_fingerprint(&r), base);
    }

    #[test]
    fn test_field_boundaries_not_separated() {
        assert_eq!(fingerprint("ab", "c", "", ""), fingerprint("a", "bc", "", ""));
    }
}
