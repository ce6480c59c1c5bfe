//! Card catalog: the immutable item collection every search runs over.
//!
//! The catalog is loaded once from a bundled JSON array and never mutated.
//! Text fields are localized; reading a locale without text falls back to
//! English.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported language variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ja => "ja",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "ja" | "jp" | "japanese" => Ok(Locale::Ja),
            other => Err(CatalogError::UnknownLocale(other.to_string())),
        }
    }
}

/// One string per locale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub ja: String,
}

impl Localized {
    pub fn new(en: &str, ja: &str) -> Self {
        Self {
            en: en.to_string(),
            ja: ja.to_string(),
        }
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Ja if !self.ja.is_empty() => &self.ja,
            _ => &self.en,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    #[serde(default)]
    pub name: Localized,
    #[serde(default)]
    pub text: Localized,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    #[serde(default)]
    pub name: Localized,
    /// Free-form damage as printed on the card ("60", "50+", "30x", ...).
    #[serde(default)]
    pub damage: Option<String>,
    #[serde(default)]
    pub cost: Vec<String>,
    #[serde(default)]
    pub text: Localized,
}

impl Attack {
    /// Numeric damage, if the printed value is a number with at most one
    /// trailing modifier. Symbolic or empty damage yields `None`.
    pub fn numeric_damage(&self) -> Option<u32> {
        let raw = self.damage.as_deref()?.trim();
        let digits = raw
            .strip_suffix(&['+', 'x', '×', '-'][..])
            .unwrap_or(raw)
            .trim_end();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub name: Localized,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub hp: Option<u32>,
    #[serde(default)]
    pub retreat_cost: Option<u32>,
    #[serde(default)]
    pub weakness: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub ability: Option<Ability>,
    #[serde(default)]
    pub attacks: Vec<Attack>,
    #[serde(default)]
    pub flavor_text: Localized,
    #[serde(default)]
    pub description: Localized,
}

impl Card {
    /// Free text other than the name, in the given locale: ability,
    /// attacks, flavor text and visual description. Empty fields skipped.
    pub fn text_fields(&self, locale: Locale) -> Vec<&str> {
        let mut fields = Vec::new();
        if let Some(ability) = &self.ability {
            fields.push(ability.name.get(locale));
            fields.push(ability.text.get(locale));
        }
        for attack in &self.attacks {
            fields.push(attack.name.get(locale));
            fields.push(attack.text.get(locale));
        }
        fields.push(self.flavor_text.get(locale));
        fields.push(self.description.get(locale));
        fields.retain(|f| !f.is_empty());
        fields
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate card id: {0}")]
    DuplicateId(String),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}

/// The loaded card collection, in dataset order.
#[derive(Debug, Default)]
pub struct Catalog {
    cards: Vec<Card>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(cards: Vec<Card>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(cards.len());
        for (idx, card) in cards.iter().enumerate() {
            if by_id.insert(card.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(card.id.clone()));
            }
        }
        Ok(Self { cards, by_id })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Self::new(cards)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        log::info!("loaded {} cards from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.by_id.get(id).map(|&idx| &self.cards[idx])
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack(damage: Option<&str>) -> Attack {
        Attack {
            damage: damage.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_numeric_damage_plain_and_modified() {
        assert_eq!(attack(Some("60")).numeric_damage(), Some(60));
        assert_eq!(attack(Some("50+")).numeric_damage(), Some(50));
        assert_eq!(attack(Some("30x")).numeric_damage(), Some(30));
        assert_eq!(attack(Some("20×")).numeric_damage(), Some(20));
    }

    #[test]
    fn test_numeric_damage_symbolic_is_none() {
        assert_eq!(attack(None).numeric_damage(), None);
        assert_eq!(attack(Some("")).numeric_damage(), None);
        assert_eq!(attack(Some("?")).numeric_damage(), None);
        assert_eq!(attack(Some("x")).numeric_damage(), None);
        assert_eq!(attack(Some("1d6")).numeric_damage(), None);
    }

    #[test]
    fn test_localized_falls_back_to_english() {
        let text = Localized::new("Pikachu", "");
        assert_eq!(text.get(Locale::Ja), "Pikachu");

        let text = Localized::new("Pikachu", "ピカチュウ");
        assert_eq!(text.get(Locale::Ja), "ピカチュウ");
        assert_eq!(text.get(Locale::En), "Pikachu");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("ja".parse::<Locale>().unwrap(), Locale::Ja);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let json = r#"[{"id": "a1"}, {"id": "a1"}]"#;
        let result = Catalog::from_json(json);
        assert!(matches!(result, Err(CatalogError::DuplicateId(id)) if id == "a1"));
    }

    #[test]
    fn test_catalog_minimal_cards_deserialize() {
        let json = r#"[
            {"id": "a1", "name": {"en": "Bulbasaur"}, "category": "Pokemon", "types": ["Grass"], "hp": 70},
            {"id": "a2", "category": "Trainer"}
        ]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a1").unwrap().hp, Some(70));
        assert!(catalog.get("a2").unwrap().types.is_empty());
        assert!(catalog.get("zz").is_none());
    }

    #[test]
    fn test_text_fields_skip_empty() {
        let card = Card {
            id: "a1".to_string(),
            name: Localized::new("Charmander", "ヒトカゲ"),
            attacks: vec![Attack {
                name: Localized::new("Ember", ""),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(card.text_fields(Locale::En), vec!["Ember"]);
        assert_eq!(card.text_fields(Locale::Ja), vec!["Ember"]);
    }
}
