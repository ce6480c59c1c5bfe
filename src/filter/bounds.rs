use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A numeric predicate bound as received from the query parser.
///
/// Numbers and numeric strings become `Value`. Anything else is kept as
/// `Invalid` so the predicate can fail for every card instead of failing
/// the whole query.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Value(f64),
    Invalid(String),
}

impl Bound {
    /// Numbers and numeric strings are values, anything else is invalid.
    pub fn from_json(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) => Bound::Value(v),
                None => Bound::Invalid(n.to_string()),
            },
            serde_json::Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Bound::Value(v),
                _ => Bound::Invalid(s),
            },
            other => Bound::Invalid(other.to_string()),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Bound::Value(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Lower bound: `actual >= bound`. Invalid bounds and missing values
    /// never hold.
    pub fn min_holds(&self, actual: Option<u32>) -> bool {
        match (self.value(), actual) {
            (Some(bound), Some(actual)) => f64::from(actual) >= bound,
            _ => false,
        }
    }

    /// Upper bound: `actual <= bound`.
    pub fn max_holds(&self, actual: Option<u32>) -> bool {
        match (self.value(), actual) {
            (Some(bound), Some(actual)) => f64::from(actual) <= bound,
            _ => false,
        }
    }
}

impl From<u32> for Bound {
    fn from(v: u32) -> Self {
        Bound::Value(f64::from(v))
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Bound::from_json)
    }
}

impl Serialize for Bound {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Bound::Value(v) => serializer.serialize_f64(*v),
            Bound::Invalid(s) => serializer.serialize_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Bound {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bound_from_number_and_numeric_string() {
        assert_eq!(parse("200"), Bound::Value(200.0));
        assert_eq!(parse("\"120\""), Bound::Value(120.0));
        assert_eq!(parse("\" 90 \""), Bound::Value(90.0));
    }

    #[test]
    fn test_bound_non_numeric_is_invalid() {
        assert!(matches!(parse("\"lots\""), Bound::Invalid(_)));
        assert!(matches!(parse("true"), Bound::Invalid(_)));
        assert!(matches!(parse("[1]"), Bound::Invalid(_)));
    }

    #[test]
    fn test_invalid_bound_never_holds() {
        let bound = Bound::Invalid("lots".to_string());
        assert!(!bound.min_holds(Some(100)));
        assert!(!bound.max_holds(Some(100)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bound = Bound::from(100);
        assert!(bound.min_holds(Some(100)));
        assert!(bound.max_holds(Some(100)));
        assert!(!bound.min_holds(Some(99)));
        assert!(!bound.max_holds(Some(101)));
        assert!(!bound.min_holds(None));
    }
}
