use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A derived ratio that may be undefined.
///
/// Any ratio with a zero (or non-finite) denominator is `Undefined` instead of
/// infinite or NaN. Serializes as a number or `null`; displays as `n/a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    /// `numerator / denominator`, or `Undefined` when the quotient would not
    /// be a finite number.
    #[must_use]
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
            return Metric::Undefined;
        }
        Metric::Value(numerator / denominator)
    }

    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    #[must_use]
    pub fn is_undefined(self) -> bool {
        matches!(self, Metric::Undefined)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Value(v) => {
                let rendered = match f.precision() {
                    Some(p) => format!("{v:.p$}"),
                    None => v.to_string(),
                };
                f.pad(&rendered)
            }
            Metric::Undefined => f.pad("n/a"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.map_or(Metric::Undefined, Metric::Value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_undefined() {
        assert_eq!(Metric::ratio(100.0, 0.0), Metric::Undefined);
        assert_eq!(Metric::ratio(0.0, 0.0), Metric::Undefined);
    }

    #[test]
    fn ratio_divides() {
        assert_eq!(Metric::ratio(300.0, 100.0), Metric::Value(3.0));
    }

    #[test]
    fn display_honours_precision_and_width() {
        assert_eq!(format!("{:.2}", Metric::Value(1.0 / 3.0)), "0.33");
        assert_eq!(format!("{:<5}|", Metric::Undefined), "n/a  |");
    }

    #[test]
    fn serializes_undefined_as_null() {
        let json = serde_json::to_string(&[Metric::Value(1.5), Metric::Undefined]).unwrap();
        assert_eq!(json, "[1.5,null]");
        let back: Vec<Metric> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Metric::Value(1.5), Metric::Undefined]);
    }
}
