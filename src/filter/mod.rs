//! Structured card filtering.
//!
//! A [`CardFilter`] is the structured half of a parsed query. Every field is
//! optional and an absent field places no constraint. The supplied fields are
//! compiled into a list of independent [`Predicate`]s which are combined by a
//! short-circuiting conjunction, so a card stops being evaluated at the first
//! predicate it fails.

mod bounds;
mod raw;

use serde::{Deserialize, Serialize};

use crate::catalog::{Card, Locale};

pub use bounds::Bound;

/// Structured predicates extracted from a natural-language query.
///
/// Deserialization never fails on a field's value: a malformed field is
/// recorded in `invalid` and becomes a predicate no card satisfies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "raw::RawFilter")]
pub struct CardFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_gte: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_lte: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_damage_gte: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_damage_lte: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retreat_lte: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weakness_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_ability: Option<bool>,
    /// Names of fields whose value could not be understood
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<String>,
}

/// Output of the query-parsing step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    #[serde(default)]
    pub filters: CardFilter,
    /// Free text for the lexical and vector stages. `None` skips both.
    #[serde(default)]
    pub semantic_query: Option<String>,
}

impl ParsedQuery {
    /// Whole raw text as the semantic query, no structured filters.
    pub fn fallback(raw: &str) -> Self {
        Self {
            filters: CardFilter::default(),
            semantic_query: Some(raw.to_string()),
        }
        .normalized()
    }

    /// Blank semantic queries are treated as absent.
    pub fn normalized(mut self) -> Self {
        self.semantic_query = self
            .semantic_query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }
}

/// One compiled predicate. Borrowed from the filter it was built from.
#[derive(Debug)]
pub enum Predicate<'a> {
    /// Lowercased needle.
    Name(String),
    Category(&'a str),
    Stage(&'a str),
    Rarity(&'a str),
    Set(&'a str),
    Types(&'a [String]),
    HpMin(&'a Bound),
    HpMax(&'a Bound),
    DamageMin(&'a Bound),
    DamageMax(&'a Bound),
    RetreatMax(&'a Bound),
    Weakness(&'a str),
    HasAbility(bool),
    /// A malformed field. Never holds.
    Invalid(&'a str),
}

impl Predicate<'_> {
    pub fn test(&self, card: &Card, locale: Locale) -> bool {
        match self {
            Predicate::Name(needle) => card.name.get(locale).to_lowercase().contains(needle),
            Predicate::Category(v) => card.category == *v,
            Predicate::Stage(v) => card.stage.as_deref() == Some(*v),
            Predicate::Rarity(v) => card.rarity.as_deref() == Some(*v),
            Predicate::Set(v) => card.set.as_deref() == Some(*v),
            Predicate::Types(wanted) => card.types.iter().any(|t| wanted.contains(t)),
            Predicate::HpMin(b) => b.min_holds(card.hp),
            Predicate::HpMax(b) => b.max_holds(card.hp),
            Predicate::DamageMin(b) => card
                .attacks
                .iter()
                .any(|a| b.min_holds(a.numeric_damage())),
            Predicate::DamageMax(b) => card
                .attacks
                .iter()
                .any(|a| b.max_holds(a.numeric_damage())),
            Predicate::RetreatMax(b) => b.max_holds(card.retreat_cost),
            Predicate::Weakness(v) => card.weakness.as_deref() == Some(*v),
            Predicate::HasAbility(wanted) => card.ability.is_some() == *wanted,
            Predicate::Invalid(_) => false,
        }
    }
}

impl CardFilter {
    /// Compile the supplied fields, in a fixed order, into predicates.
    pub fn predicates(&self) -> Vec<Predicate<'_>> {
        let mut preds: Vec<Predicate<'_>> =
            self.invalid.iter().map(|f| Predicate::Invalid(f)).collect();
        if let Some(name) = &self.name {
            preds.push(Predicate::Name(name.to_lowercase()));
        }
        if let Some(v) = &self.category {
            preds.push(Predicate::Category(v));
        }
        if let Some(v) = &self.stage {
            preds.push(Predicate::Stage(v));
        }
        if let Some(v) = &self.rarity {
            preds.push(Predicate::Rarity(v));
        }
        if let Some(v) = &self.set {
            preds.push(Predicate::Set(v));
        }
        if let Some(v) = &self.types {
            preds.push(Predicate::Types(v));
        }
        if let Some(b) = &self.hp_gte {
            preds.push(Predicate::HpMin(b));
        }
        if let Some(b) = &self.hp_lte {
            preds.push(Predicate::HpMax(b));
        }
        if let Some(b) = &self.attack_damage_gte {
            preds.push(Predicate::DamageMin(b));
        }
        if let Some(b) = &self.attack_damage_lte {
            preds.push(Predicate::DamageMax(b));
        }
        if let Some(b) = &self.retreat_lte {
            preds.push(Predicate::RetreatMax(b));
        }
        if let Some(v) = &self.weakness_type {
            preds.push(Predicate::Weakness(v));
        }
        if let Some(v) = self.has_ability {
            preds.push(Predicate::HasAbility(v));
        }
        preds
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    #[allow(dead_code)]
    pub fn matches(&self, card: &Card, locale: Locale) -> bool {
        all_hold(&self.predicates(), card, locale)
    }
}

/// Short-circuiting conjunction: stops at the first predicate that fails.
pub(crate) fn all_hold<'a, 'p: 'a>(
    preds: impl IntoIterator<Item = &'a Predicate<'p>>,
    card: &Card,
    locale: Locale,
) -> bool {
    preds.into_iter().all(|p| p.test(card, locale))
}

/// Order-preserving subsequence of `cards` satisfying every predicate.
pub fn apply<'c>(cards: &'c [Card], filter: &CardFilter, locale: Locale) -> Vec<&'c Card> {
    let preds = filter.predicates();
    cards
        .iter()
        .filter(|card| all_hold(&preds, card, locale))
        .collect()
}
