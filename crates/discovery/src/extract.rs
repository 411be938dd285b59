//! Turns captured cards into [`DiscoveryRecord`]s.

use {
    medscout_browser::{NodeError, Lookup, ResultNode},
    tracing::{debug, warn},
};

use crate::{
    record::DiscoveryRecord,
    rules::{RuleSet, SelectorSet},
};

/// Applies a [`RuleSet`] to rendered cards.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    selectors: SelectorSet,
    rules: RuleSet,
}

impl Extractor {
    pub fn new(selectors: SelectorSet) -> Self {
        Self {
            selectors,
            rules: RuleSet::default(),
        }
    }

    /// Replace the default field rules.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn selectors(&self) -> &SelectorSet {
        &self.selectors
    }

    /// Lookups the capture step must run for these rules.
    pub fn lookups(&self) -> Vec<Lookup> {
        self.selectors.lookups()
    }

    /// Extract one card. `Ok(None)` means sponsored or not worth emitting.
    pub fn extract_card(
        &self,
        node: &dyn ResultNode,
        query: &str,
    ) -> Result<Option<DiscoveryRecord>, NodeError> {
        let s = &self.selectors;
        let r = &self.rules;

        if (r.sponsored)(node, s)? {
            return Ok(None);
        }
        let Some(name) = (r.name)(node, s)? else {
            return Ok(None);
        };

        let mut rating = (r.rating)(node, s)?;
        let mut review_count = (r.review_count)(node, s)?;
        if rating.is_none()
            && let Some(label) = (r.star_label)(node, s)?
        {
            rating = label.rating;
            review_count = review_count.or(label.review_count);
        }

        let record = DiscoveryRecord {
            name,
            category: (r.category)(node, s)?,
            rating,
            review_count,
            address: (r.address)(node, s)?,
            phone: (r.phone)(node, s)?,
            hours_status: (r.hours_status)(node, s)?,
            website: (r.website)(node, s)?,
            review_snippet: (r.review_snippet)(node, s)?,
            search_query: query.to_string(),
        };

        Ok(record.passes_gate().then_some(record))
    }

    /// Extract every card in order, skipping cards that fail to read.
    pub fn extract<'a, N>(
        &'a self,
        cards: &'a [N],
        query: &'a str,
    ) -> impl Iterator<Item = DiscoveryRecord> + 'a
    where
        N: ResultNode,
    {
        cards
            .iter()
            .enumerate()
            .filter_map(move |(card, node)| match self.extract_card(node, query) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    debug!(query, card, "card skipped");
                    None
                },
                Err(e) => {
                    warn!(query, card, error = %e, "failed to read card");
                    None
                },
            })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        medscout_browser::CardSnapshot,
        rstest::{fixture, rstest},
    };

    const QUERY: &str = "Springfield hospitals";

    #[fixture]
    fn extractor() -> Extractor {
        Extractor::default()
    }

    fn named(index: usize, name: &str) -> CardSnapshot {
        let s = SelectorSet::default();
        CardSnapshot::new(index).with_texts(&s.name, [name])
    }

    #[rstest]
    fn extracts_a_full_card(extractor: Extractor) {
        let s = extractor.selectors().clone();
        let card = named(0, "Springfield General")
            .with_texts(&s.rating, ["4.5"])
            .with_texts(&s.review_count, ["(120)"])
            .with_texts(&s.meta_span, ["Hospital", "·"])
            .with_texts(&s.meta_row, ["Hospital · 123 Main St, Springfield"])
            .with_texts(&s.phone, ["(555) 010-0000"])
            .with_texts(&s.hours, ["Open 24 hours"])
            .with_attributes(&s.website, "href", ["https://springfield-general.example/"])
            .with_texts(&s.snippet, ["\"Great ER\""]);

        let record = extractor.extract_card(&card, QUERY).unwrap().unwrap();
        assert_eq!(record.name, "Springfield General");
        assert_eq!(record.rating, Some(4.5));
        assert_eq!(record.review_count, Some(120));
        assert_eq!(record.category.as_deref(), Some("Hospital"));
        assert_eq!(record.address.as_deref(), Some("123 Main St, Springfield"));
        assert_eq!(record.phone.as_deref(), Some("(555) 010-0000"));
        assert_eq!(record.hours_status.as_deref(), Some("Open 24 hours"));
        assert_eq!(record.review_snippet.as_deref(), Some("Great ER"));
        assert_eq!(record.search_query, QUERY);
    }

    #[rstest]
    fn falls_back_to_star_label(extractor: Extractor) {
        let s = extractor.selectors().clone();
        let card = named(0, "Springfield General")
            .with_texts(&s.meta_row, ["Hospital · 123 Main St, Springfield"])
            .with_attributes(&s.star_label, "aria-label", ["4.5 stars (120 Reviews)"]);

        let record = extractor.extract_card(&card, QUERY).unwrap().unwrap();
        assert_eq!(record.rating, Some(4.5));
        assert_eq!(record.review_count, Some(120));
        assert_eq!(record.address.as_deref(), Some("123 Main St, Springfield"));
    }

    #[rstest]
    fn star_label_does_not_override_review_count(extractor: Extractor) {
        let s = extractor.selectors().clone();
        let card = named(0, "Clinic")
            .with_texts(&s.phone, ["555"])
            .with_texts(&s.review_count, ["(7)"])
            .with_attributes(&s.star_label, "aria-label", ["4 stars 9 reviews"]);

        let record = extractor.extract_card(&card, QUERY).unwrap().unwrap();
        assert_eq!(record.rating, Some(4.0));
        assert_eq!(record.review_count, Some(7));
    }

    #[rstest]
    fn skips_sponsored_cards(extractor: Extractor) {
        let s = extractor.selectors().clone();
        let card = named(0, "Paid Clinic")
            .with_texts(&s.phone, ["555"])
            .with_texts(&s.sponsored, [""]);
        assert_eq!(extractor.extract_card(&card, QUERY).unwrap(), None);
    }

    #[rstest]
    fn gate_drops_name_only_cards(extractor: Extractor) {
        let card = named(0, "Nowhere Hospital");
        assert_eq!(extractor.extract_card(&card, QUERY).unwrap(), None);
    }

    #[rstest]
    fn swapped_rule_feeds_the_gate(extractor: Extractor) {
        fn no_phone(_: &dyn ResultNode, _: &SelectorSet) -> Result<Option<String>, NodeError> {
            Ok(None)
        }

        let s = extractor.selectors().clone();
        let card = named(0, "Call Ahead Clinic").with_texts(&s.phone, ["(555) 010-0000"]);
        assert!(extractor.extract_card(&card, QUERY).unwrap().is_some());

        let custom = extractor.with_rules(RuleSet {
            phone: no_phone,
            ..RuleSet::default()
        });
        assert_eq!(custom.extract_card(&card, QUERY).unwrap(), None);
    }

    #[rstest]
    fn swapped_rule_reads_another_selector(extractor: Extractor) {
        fn address_from_hours(
            node: &dyn ResultNode,
            s: &SelectorSet,
        ) -> Result<Option<String>, NodeError> {
            Ok(node.texts(&s.hours)?.into_iter().next())
        }

        let s = extractor.selectors().clone();
        let card = named(0, "Corner Clinic").with_texts(&s.hours, ["12 Corner Street"]);
        let custom = extractor.with_rules(RuleSet {
            address: address_from_hours,
            ..RuleSet::default()
        });

        let record = custom.extract_card(&card, QUERY).unwrap().unwrap();
        assert_eq!(record.address.as_deref(), Some("12 Corner Street"));
        assert_eq!(record.hours_status.as_deref(), Some("12 Corner Street"));
    }

    #[rstest]
    fn extract_skips_unreadable_cards_and_keeps_order(extractor: Extractor) {
        let s = extractor.selectors().clone();
        let broken = named(1, "Broken").with_raw(&Lookup::text(s.phone.as_str()), serde_json::json!("x"));
        let cards = vec![
            named(0, "First").with_texts(&s.phone, ["1"]),
            broken,
            named(2, "Third").with_texts(&s.phone, ["3"]),
        ];

        let names: Vec<String> = extractor.extract(&cards, QUERY).map(|r| r.name).collect();
        assert_eq!(names, vec!["First", "Third"]);
    }
}
