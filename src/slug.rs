//! URL slugs and heading anchors.
//!
//! [`slugify`] is the single slug rule used both for a document's own slug
//! and for in-page heading anchors. [`add_heading_anchors`] walks rendered
//! HTML and gives every `<h2>` without an `id` a unique `toc-` identifier.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Namespace prefix for generated heading identifiers.
pub const ANCHOR_PREFIX: &str = "toc-";

/// Lowercases `text`, collapses every run of non-alphanumeric characters
/// into a single hyphen, and trims hyphens from both ends.
///
/// HTML entities such as `&amp;` are dropped first so that rendered
/// heading text slugs the same as its source.
///
/// - `"Getting Started"` becomes `"getting-started"`
/// - `"  C++ & Rust!  "` becomes `"c-rust"`
/// - `"Café Setup"` becomes `"café-setup"`
pub fn slugify(text: &str) -> String {
    let text = entity_re().replace_all(text, "");
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Identifiers already used within one rendered document.
///
/// Lives for exactly one rendering pass.
#[derive(Debug, Default)]
pub struct HeadingAnchorSet {
    used: HashSet<String>,
}

impl HeadingAnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `base` if unused, otherwise the first free `base-2`, `base-3`, …
    /// and marks the result as used.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2u32;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    /// Marks an identifier that was supplied by the author.
    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

fn h2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<h2(\s[^>]*)?>(.*?)</h2\s*>").expect("valid h2 pattern")
    })
}

/// One attribute per match, quoted values consumed whole.
fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid attribute pattern")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"))
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#x[0-9a-fA-F]+);")
            .expect("valid entity pattern")
    })
}

/// Adds a unique `id` to every `<h2>` in `html` that lacks one.
///
/// Headings are visited in document order. An existing `id` is never
/// rewritten, but it is reserved so generated identifiers cannot clash
/// with it. Attributes and inner HTML are kept verbatim. Headings whose
/// text is empty still receive an identifier (`toc-`, `toc--2`, …).
pub fn add_heading_anchors(html: &str, anchors: &mut HeadingAnchorSet) -> String {
    // Author-supplied ids first, so a later generated id cannot take one
    // that appears further down the document.
    for caps in h2_re().captures_iter(html) {
        if let Some(id) = caps.get(1).and_then(|attrs| existing_id(attrs.as_str())) {
            anchors.reserve(&id);
        }
    }

    h2_re()
        .replace_all(html, |caps: &Captures| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if existing_id(attrs).is_some() {
                return caps[0].to_string();
            }
            let inner = &caps[2];
            let text = tag_re().replace_all(inner, "");
            let base = format!("{}{}", ANCHOR_PREFIX, slugify(&text));
            let id = anchors.claim(&base);
            format!("<h2{} id=\"{}\">{}</h2>", attrs, id, inner)
        })
        .into_owned()
}

fn existing_id(attrs: &str) -> Option<String> {
    attr_re()
        .captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case("id"))
        .map(|c| {
            c.get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(html: &str) -> String {
        add_heading_anchors(html, &mut HeadingAnchorSet::new())
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  C++ & Rust!  "), "c-rust");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Q&amp;A"), "qa");
        assert_eq!(slugify("v2.0 -- Release_Notes"), "v2-0-release-notes");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_keeps_non_ascii_letters() {
        assert_eq!(slugify("Café Setup"), "café-setup");
        assert_eq!(slugify("Über uns"), "über-uns");
        assert_eq!(slugify("設定"), "設定");
    }

    #[test]
    fn test_non_latin_headings_get_distinct_anchors() {
        let out = anchors("<h2>設定</h2><h2>概要</h2>");
        assert_eq!(out, "<h2 id=\"toc-設定\">設定</h2><h2 id=\"toc-概要\">概要</h2>");
    }

    #[test]
    fn test_id_inside_quoted_value_is_not_an_id() {
        let out = anchors("<h2 title=\"x id=y\">Setup</h2>");
        assert_eq!(out, "<h2 title=\"x id=y\" id=\"toc-setup\">Setup</h2>");

        let out = anchors("<h2 data-note='id=\"n\"' id=real>A</h2>");
        assert_eq!(out, "<h2 data-note='id=\"n\"' id=real>A</h2>");
    }

    #[test]
    fn test_single_heading() {
        assert_eq!(anchors("<h2>Setup</h2>"), "<h2 id=\"toc-setup\">Setup</h2>");
    }

    #[test]
    fn test_duplicate_headings_get_numeric_suffix() {
        let out = anchors("<h2>Setup</h2>\n<p>x</p>\n<h2>Setup</h2>\n<h2>Setup</h2>");
        assert!(out.contains("<h2 id=\"toc-setup\">Setup</h2>"));
        assert!(out.contains("<h2 id=\"toc-setup-2\">Setup</h2>"));
        assert!(out.contains("<h2 id=\"toc-setup-3\">Setup</h2>"));
    }

    #[test]
    fn test_existing_id_untouched() {
        let html = "<h2 id=\"custom\">Setup</h2>";
        assert_eq!(anchors(html), html);

        let html = "<h2 class='x' ID='keep'>A</h2>";
        assert_eq!(anchors(html), html);
    }

    #[test]
    fn test_data_id_is_not_an_id() {
        let out = anchors("<h2 data-id=\"7\">Setup</h2>");
        assert_eq!(out, "<h2 data-id=\"7\" id=\"toc-setup\">Setup</h2>");
    }

    #[test]
    fn test_generated_id_avoids_author_id_later_in_document() {
        let out = anchors("<h2>Setup</h2><h2 id=\"toc-setup\">Other</h2>");
        assert!(out.starts_with("<h2 id=\"toc-setup-2\">Setup</h2>"));
        assert!(out.ends_with("<h2 id=\"toc-setup\">Other</h2>"));
    }

    #[test]
    fn test_inner_markup_stripped_for_slug_but_preserved() {
        let out = anchors("<h2 class=\"lead\">Install <code>cargo</code> &amp; go</h2>");
        assert_eq!(
            out,
            "<h2 class=\"lead\" id=\"toc-install-cargo-go\">Install <code>cargo</code> &amp; go</h2>"
        );
    }

    #[test]
    fn test_empty_heading_still_anchored() {
        let out = anchors("<h2></h2><h2><em></em></h2>");
        assert_eq!(out, "<h2 id=\"toc-\"></h2><h2 id=\"toc--2\"><em></em></h2>");
    }

    #[test]
    fn test_other_levels_ignored() {
        let html = "<h1>Guide</h1><h3>Deep</h3><h2x>no</h2x>";
        assert_eq!(anchors(html), html);
    }

    #[test]
    fn test_anchor_set_claim() {
        let mut set = HeadingAnchorSet::new();
        assert!(set.is_empty());
        assert_eq!(set.claim("toc-a"), "toc-a");
        assert_eq!(set.claim("toc-a"), "toc-a-2");
        set.reserve("toc-a-3");
        assert_eq!(set.claim("toc-a"), "toc-a-4");
        assert!(set.contains("toc-a-2"));
        assert_eq!(set.len(), 4);
    }
}
