//! Per-field extraction rules.
//!
//! Every rule is a pure function of one rendered card and the selector set.
//! Absence is never an error: a rule returns `Ok(None)` and the field stays
//! null. Only an unreadable node produces an error.

use std::sync::LazyLock;

use {
    medscout_browser::{NodeError, Lookup, ResultNode},
    regex::Regex,
    tracing::debug,
    url::Url,
};

/// Separator between segments of a metadata row.
const BULLET: char = '·';

/// Aria-label attribute read by the star-label fallback.
const ARIA_LABEL: &str = "aria-label";

static RATING_TEXT: LazyLock<Regex> = LazyLock::new(|| regex(r"^\d+(\.\d+)?$"));
static PARENTHESIZED_COUNT: LazyLock<Regex> = LazyLock::new(|| regex(r"\((\d+(?:,\d+)*)\)"));
static LABEL_STARS: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d+\.?\d*)\s*stars?"));
static LABEL_REVIEWS: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d+(?:,\d+)*)\s*[Rr]eviews?"));

#[allow(clippy::expect_used)]
fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// CSS selectors for every field, bound to the search surface's markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    pub feed: String,
    pub card: String,
    pub sponsored: String,
    pub name: String,
    pub rating: String,
    pub review_count: String,
    pub star_label: String,
    pub meta_span: String,
    pub meta_row: String,
    pub phone: String,
    pub hours: String,
    pub website: String,
    pub snippet: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self::from(&medscout_config::SelectorsConfig::default())
    }
}

impl From<&medscout_config::SelectorsConfig> for SelectorSet {
    fn from(cfg: &medscout_config::SelectorsConfig) -> Self {
        Self {
            feed: cfg.feed.clone(),
            card: cfg.card.clone(),
            sponsored: cfg.sponsored.clone(),
            name: cfg.name.clone(),
            rating: cfg.rating.clone(),
            review_count: cfg.review_count.clone(),
            star_label: cfg.star_label.clone(),
            meta_span: cfg.meta_span.clone(),
            meta_row: cfg.meta_row.clone(),
            phone: cfg.phone.clone(),
            hours: cfg.hours.clone(),
            website: cfg.website.clone(),
            snippet: cfg.snippet.clone(),
        }
    }
}

impl SelectorSet {
    /// Lookups the page must capture for the rules below.
    pub fn lookups(&self) -> Vec<Lookup> {
        let mut lookups: Vec<Lookup> = [
            &self.sponsored,
            &self.name,
            &self.rating,
            &self.review_count,
            &self.meta_span,
            &self.meta_row,
            &self.phone,
            &self.hours,
            &self.snippet,
        ]
        .into_iter()
        .map(|s| Lookup::text(s.as_str()))
        .collect();
        lookups.push(Lookup::attribute(self.star_label.as_str(), ARIA_LABEL));
        lookups.push(Lookup::attribute(self.website.as_str(), "href"));
        lookups.dedup();
        lookups
    }
}

/// Rating and review count parsed from a combined accessible label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StarLabel {
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
}

pub type Rule<T> = fn(&dyn ResultNode, &SelectorSet) -> Result<T, NodeError>;

/// The full set of field rules applied to each card.
#[derive(Clone, Copy)]
pub struct RuleSet {
    pub sponsored: Rule<bool>,
    pub name: Rule<Option<String>>,
    pub rating: Rule<Option<f64>>,
    pub review_count: Rule<Option<u64>>,
    pub star_label: Rule<Option<StarLabel>>,
    pub category: Rule<Option<String>>,
    pub address: Rule<Option<String>>,
    pub phone: Rule<Option<String>>,
    pub hours_status: Rule<Option<String>>,
    pub website: Rule<Option<Url>>,
    pub review_snippet: Rule<Option<String>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            sponsored,
            name,
            rating,
            review_count,
            star_label,
            category,
            address,
            phone,
            hours_status,
            website,
            review_snippet,
        }
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet").finish_non_exhaustive()
    }
}

pub fn sponsored(node: &dyn ResultNode, s: &SelectorSet) -> Result<bool, NodeError> {
    node.contains(&s.sponsored)
}

/// Text of the first title match; empty means the card has no name.
pub fn name(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    Ok(node
        .texts(&s.name)?
        .into_iter()
        .next()
        .filter(|n| !n.is_empty()))
}

pub fn rating(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<f64>, NodeError> {
    let Some(text) = node.texts(&s.rating)?.into_iter().next() else {
        return Ok(None);
    };
    Ok(parse_rating(&text.replace(',', ".")))
}

pub fn review_count(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<u64>, NodeError> {
    let Some(text) = node.texts(&s.review_count)?.into_iter().next() else {
        return Ok(None);
    };
    Ok(PARENTHESIZED_COUNT
        .captures(&text)
        .and_then(|c| parse_count(&c[1])))
}

/// Parse a label such as `"4.5 stars (120 Reviews)"`.
pub fn star_label(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<StarLabel>, NodeError> {
    let Some(label) = node
        .attributes(&s.star_label, ARIA_LABEL)?
        .into_iter()
        .find(|l| !l.is_empty())
    else {
        return Ok(None);
    };
    Ok(Some(parse_star_label(&label)))
}

pub fn parse_star_label(label: &str) -> StarLabel {
    StarLabel {
        rating: LABEL_STARS
            .captures(label)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|r| in_rating_range(*r)),
        review_count: LABEL_REVIEWS
            .captures(label)
            .and_then(|c| parse_count(&c[1])),
    }
}

/// First metadata segment that is not a bullet and does not start with a digit.
pub fn category(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    Ok(node.texts(&s.meta_span)?.into_iter().find(|t| {
        !t.is_empty()
            && t.chars().any(|c| c != BULLET && !c.is_whitespace())
            && !t.starts_with(|c: char| c.is_ascii_digit())
    }))
}

/// First bullet-separated metadata segment that looks like a street address.
pub fn address(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    Ok(node
        .texts(&s.meta_row)?
        .iter()
        .filter(|row| row.contains(BULLET))
        .find_map(|row| {
            row.split(BULLET)
                .map(str::trim)
                .find(|part| looks_like_address(part))
                .map(String::from)
        }))
}

pub fn looks_like_address(part: &str) -> bool {
    part.chars().count() > 10
        && part.chars().any(|c| c.is_ascii_digit())
        && !part.starts_with('0')
        && !part.to_lowercase().contains("stars")
}

pub fn phone(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    first_text(node, &s.phone)
}

pub fn hours_status(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    first_text(node, &s.hours)
}

pub fn website(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<Url>, NodeError> {
    let Some(href) = node.attributes(&s.website, "href")?.into_iter().next() else {
        return Ok(None);
    };
    match Url::parse(&href) {
        Ok(url) => Ok(Some(url)),
        Err(e) => {
            debug!(href = %href, error = %e, "ignoring unparseable website link");
            Ok(None)
        },
    }
}

pub fn review_snippet(node: &dyn ResultNode, s: &SelectorSet) -> Result<Option<String>, NodeError> {
    Ok(first_text(node, &s.snippet)?
        .map(|t| t.replace('"', "").trim().to_string())
        .filter(|t| !t.is_empty()))
}

fn first_text(node: &dyn ResultNode, selector: &str) -> Result<Option<String>, NodeError> {
    Ok(node
        .texts(selector)?
        .into_iter()
        .next()
        .filter(|t| !t.is_empty()))
}

fn parse_rating(text: &str) -> Option<f64> {
    if !RATING_TEXT.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|r| in_rating_range(*r))
}

fn in_rating_range(rating: f64) -> bool {
    (0.0..=5.0).contains(&rating)
}

fn parse_count(digits: &str) -> Option<u64> {
    digits.replace(',', "").parse().ok()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, medscout_browser::CardSnapshot, rstest::rstest};

    fn sel() -> SelectorSet {
        SelectorSet::default()
    }

    #[rstest]
    #[case("4.5", Some(4.5))]
    #[case("4,2", Some(4.2))]
    #[case("5", Some(5.0))]
    #[case("New", None)]
    #[case("4.5 stars", None)]
    #[case("12", None)]
    fn rating_text(#[case] text: &str, #[case] expected: Option<f64>) {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.rating, [text]);
        assert_eq!(rating(&card, &s).unwrap(), expected);
    }

    #[rstest]
    #[case("(120)", Some(120))]
    #[case("(1,234)", Some(1234))]
    #[case("4.5(87)", Some(87))]
    #[case("no reviews", None)]
    fn review_count_text(#[case] text: &str, #[case] expected: Option<u64>) {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.review_count, [text]);
        assert_eq!(review_count(&card, &s).unwrap(), expected);
    }

    #[rstest]
    #[case("4.5 stars (120 Reviews)", Some(4.5), Some(120))]
    #[case("3 stars 1,024 reviews", Some(3.0), Some(1024))]
    #[case("4.1 star", Some(4.1), None)]
    #[case("No reviews yet", None, None)]
    fn star_label_text(
        #[case] label: &str,
        #[case] rating: Option<f64>,
        #[case] reviews: Option<u64>,
    ) {
        let parsed = parse_star_label(label);
        assert_eq!(parsed.rating, rating);
        assert_eq!(parsed.review_count, reviews);
    }

    #[test]
    fn category_skips_bullets_and_numeric_segments() {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.meta_span, ["", "4.6", "·", "General hospital"]);
        assert_eq!(
            category(&card, &s).unwrap().as_deref(),
            Some("General hospital")
        );
    }

    #[rstest]
    #[case("Hospital · 123 Main St, Springfield", Some("123 Main St, Springfield"))]
    #[case("Clinic · Open 24 hours · 42 Elm Road", Some("Open 24 hours"))]
    #[case("4.5 stars · 900 Oak Avenue", Some("900 Oak Avenue"))]
    #[case("Clinic · 0800 123 456 78", None)]
    #[case("Clinic · Main Street", None)]
    #[case("123 Main St, Springfield", None)]
    fn address_heuristic(#[case] row: &str, #[case] expected: Option<&str>) {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.meta_row, [row]);
        assert_eq!(address(&card, &s).unwrap().as_deref(), expected);
    }

    #[test]
    fn star_fragment_is_not_an_address() {
        assert!(!looks_like_address("4.5 stars 120"));
        assert!(looks_like_address("77 Massachusetts Ave"));
    }

    #[test]
    fn website_requires_a_parseable_url() {
        let s = sel();
        let good = CardSnapshot::new(0).with_attributes(&s.website, "href", ["https://clinic.example/"]);
        assert_eq!(
            website(&good, &s).unwrap().map(|u| u.to_string()),
            Some("https://clinic.example/".to_string())
        );

        let bad = CardSnapshot::new(0).with_attributes(&s.website, "href", ["/relative"]);
        assert_eq!(website(&bad, &s).unwrap(), None);
    }

    #[test]
    fn snippet_drops_quotes() {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.snippet, ["\"Friendly staff\""]);
        assert_eq!(
            review_snippet(&card, &s).unwrap().as_deref(),
            Some("Friendly staff")
        );
    }

    #[test]
    fn empty_name_is_no_name() {
        let s = sel();
        let card = CardSnapshot::new(0).with_texts(&s.name, [""]);
        assert_eq!(name(&card, &s).unwrap(), None);
    }

    #[test]
    fn lookups_cover_every_selector() {
        let s = sel();
        let lookups = s.lookups();
        assert!(lookups.contains(&Lookup::text(s.name.as_str())));
        assert!(lookups.contains(&Lookup::attribute(s.star_label.as_str(), ARIA_LABEL)));
        assert!(lookups.contains(&Lookup::attribute(s.website.as_str(), "href")));
        assert_eq!(lookups.len(), 11);
    }
}
