//! Lenient wire form of [`CardFilter`].
//!
//! Parser output is untrusted. Every field is read as loose JSON first and
//! converted one by one, so a malformed field only poisons its own predicate
//! and the rest of the filter survives.

use serde::Deserialize;
use serde_json::Value;

use super::{Bound, CardFilter};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawFilter {
    name: Option<Value>,
    category: Option<Value>,
    stage: Option<Value>,
    rarity: Option<Value>,
    set: Option<Value>,
    types: Option<Value>,
    hp_gte: Option<Value>,
    hp_lte: Option<Value>,
    attack_damage_gte: Option<Value>,
    attack_damage_lte: Option<Value>,
    retreat_lte: Option<Value>,
    weakness_type: Option<Value>,
    has_ability: Option<Value>,
    invalid: Option<Value>,
}

impl From<RawFilter> for CardFilter {
    fn from(raw: RawFilter) -> Self {
        let mut invalid = Vec::new();
        if let Some(Value::Array(fields)) = raw.invalid {
            invalid.extend(
                fields
                    .into_iter()
                    .filter_map(|f| f.as_str().map(str::to_string)),
            );
        }

        let mut text = |field: &str, value: Option<Value>| match value? {
            Value::String(s) => Some(s),
            _ => {
                invalid.push(field.to_string());
                None
            }
        };
        let name = text("name", raw.name);
        let category = text("category", raw.category);
        let stage = text("stage", raw.stage);
        let rarity = text("rarity", raw.rarity);
        let set = text("set", raw.set);
        let weakness_type = text("weakness_type", raw.weakness_type);

        let types = match raw.types {
            None => None,
            Some(Value::String(s)) => Some(vec![s]),
            Some(Value::Array(items)) => {
                let names: Option<Vec<String>> = items
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                if names.is_none() {
                    invalid.push("types".to_string());
                }
                names
            }
            Some(_) => {
                invalid.push("types".to_string());
                None
            }
        };

        let has_ability = match raw.has_ability {
            None => None,
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => Some(true),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => Some(false),
            Some(_) => {
                invalid.push("has_ability".to_string());
                None
            }
        };

        invalid.sort();
        invalid.dedup();

        CardFilter {
            name,
            category,
            stage,
            rarity,
            set,
            types,
            hp_gte: raw.hp_gte.map(Bound::from_json),
            hp_lte: raw.hp_lte.map(Bound::from_json),
            attack_damage_gte: raw.attack_damage_gte.map(Bound::from_json),
            attack_damage_lte: raw.attack_damage_lte.map(Bound::from_json),
            retreat_lte: raw.retreat_lte.map(Bound::from_json),
            weakness_type,
            has_ability,
            invalid,
        }
    }
}
