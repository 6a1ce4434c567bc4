//! Human-readable prediction explanations

use super::Variant;
use crate::preprocessing::Record;
use serde_json::Value;

/// A raw-input threshold rule: one sentence above `high`, another below `low`
struct Insight {
    field: &'static str,
    high: (f64, &'static str),
    low: (f64, &'static str),
}

impl Insight {
    fn apply(&self, record: &Record) -> Option<&'static str> {
        let value = record.get(self.field).and_then(Value::as_f64)?;
        if value > self.high.0 {
            Some(self.high.1)
        } else if value < self.low.0 {
            Some(self.low.1)
        } else {
            None
        }
    }
}

const DEEP: &str = "Very deep transit suggests large planetary radius or small host star.";
const SHALLOW: &str = "Shallow transit may indicate small planet or requires high precision detection.";
const LONG_PERIOD: &str = "Long orbital period suggests distant orbit from host star.";
const SHORT_PERIOD: &str = "Ultra-short orbital period typical of hot planets close to their host stars.";
const GIANT: &str = "Large planetary radius, potentially a gas giant.";
const ROCKY: &str = "Small planetary radius, potentially rocky planet.";

const TOI_INSIGHTS: &[Insight] = &[
    Insight { field: "pl_trandep", high: (10000.0, DEEP), low: (100.0, SHALLOW) },
    Insight { field: "pl_orbper", high: (100.0, LONG_PERIOD), low: (1.0, SHORT_PERIOD) },
    Insight { field: "pl_rade", high: (20.0, GIANT), low: (2.0, ROCKY) },
];

const KOI_INSIGHTS: &[Insight] = &[
    Insight { field: "koi_depth", high: (10000.0, DEEP), low: (100.0, SHALLOW) },
    Insight { field: "koi_period", high: (100.0, LONG_PERIOD), low: (1.0, SHORT_PERIOD) },
    Insight { field: "koi_prad", high: (20.0, GIANT), low: (2.0, ROCKY) },
    Insight {
        field: "koi_model_snr",
        high: (50.0, "High signal-to-noise ratio indicates strong detection."),
        low: (10.0, "Low signal-to-noise ratio suggests marginal detection."),
    },
    Insight {
        field: "koi_teq",
        high: (1000.0, "High equilibrium temperature suggests close-in hot planet."),
        low: (300.0, "Low equilibrium temperature suggests cold distant planet."),
    },
];

const K2_INSIGHTS: &[Insight] = &[
    Insight {
        field: "pl_rade",
        high: (20.0, "Very large planetary radius suggests gas giant."),
        low: (2.0, "Small planetary radius suggests potentially rocky planet."),
    },
    Insight {
        field: "pl_orbper",
        high: (100.0, "Long orbital period suggests distant orbit."),
        low: (1.0, "Ultra-short orbital period typical of hot planets."),
    },
    Insight {
        field: "pl_insol",
        high: (1000.0, "High insolation suggests close-in hot planet."),
        low: (1.0, "Low insolation suggests cold distant planet."),
    },
    Insight {
        field: "st_teff",
        high: (6000.0, "Hot host star."),
        low: (4000.0, "Cool host star (M-dwarf)."),
    },
];

fn toi_class(class: &str) -> &'static str {
    match class {
        "FP" => "False Positive - The signal is likely caused by instrumental noise, stellar variability, or other astrophysical false positives rather than a planetary transit.",
        "PC" => "Planetary Candidate - This shows strong signatures of a planetary transit. Further observations and validation are recommended to confirm planetary nature.",
        "KP" => "Known Planet - This object has been previously confirmed as an exoplanet through multiple validation methods.",
        "CP" => "Confirmed Planet - Independently validated and confirmed as a bona fide exoplanet.",
        "APC" => "Ambiguous Planetary Candidate - The signal shows some planetary characteristics but requires additional data for confirmation.",
        "FA" => "False Alarm - The signal is likely an instrumental artifact or data processing error.",
        _ => "Classification completed based on transit characteristics.",
    }
}

fn koi_class(class: &str) -> &'static str {
    match class {
        "CONFIRMED" => "Confirmed Exoplanet - This object has been validated as a bona fide exoplanet through multiple observational methods and statistical validation.",
        "CANDIDATE" => "Planetary Candidate - Strong evidence suggests this is a planetary transit, but additional validation is required for confirmation.",
        "FALSE POSITIVE" => "False Positive - The detected signal is likely caused by astrophysical false positives, instrumental effects, or data processing artifacts rather than a genuine planetary transit.",
        "NOT DISPOSITIONED" => "Not Dispositioned - This object has not yet received a final classification and requires further analysis.",
        _ => "Classification completed based on Kepler transit characteristics.",
    }
}

fn k2_class(class: &str) -> &'static str {
    match class {
        "CONFIRMED" => "Confirmed Exoplanet - This object has been validated as a bona fide exoplanet through the K2 mission follow-up observations and statistical validation.",
        "CANDIDATE" => "Planetary Candidate - Strong evidence from K2 mission data suggests this is a planetary transit, but additional validation is required for confirmation.",
        "FALSE POSITIVE" => "False Positive - The detected signal is likely caused by instrumental effects, stellar variability, or astrophysical false positives rather than a genuine planetary transit in K2 data.",
        _ => "Classification completed based on K2 mission transit characteristics.",
    }
}

/// Explanation for a prediction made by `variant`
pub fn explain(variant: Variant, class: &str, confidence: f64, record: &Record) -> String {
    let (base, insights) = match variant {
        Variant::Toi => (toi_class(class), TOI_INSIGHTS),
        Variant::Koi => (koi_class(class), KOI_INSIGHTS),
        Variant::K2 => (k2_class(class), K2_INSIGHTS),
        Variant::Custom => return custom_explanation(class, confidence, record),
    };

    let notes: Vec<&str> = insights.iter().filter_map(|i| i.apply(record)).collect();
    if notes.is_empty() {
        base.to_string()
    } else {
        format!("{} Feature insights: {}", base, notes.join(" "))
    }
}

/// Generic explanation: confidence plus extreme values among the first three numeric inputs
pub fn custom_explanation(class: &str, confidence: f64, record: &Record) -> String {
    let base = format!("Predicted as '{}' with {:.1}% confidence.", class, confidence * 100.0);

    let factors: Vec<String> = record
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Number(n) => n.as_f64().map(|v| (name, n, v)),
            _ => None,
        })
        .take(3)
        .filter_map(|(name, n, v)| {
            if v > 1000.0 {
                Some(format!("High {} ({})", name, n))
            } else if v < 0.1 {
                Some(format!("Very low {} ({})", name, n))
            } else {
                None
            }
        })
        .collect();

    if factors.is_empty() {
        format!("{} Based on the trained custom model.", base)
    } else {
        format!("{} Key factors: {}.", base, factors.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_koi_insights_follow_thresholds() {
        let r = record(json!({ "koi_depth": 20000.0, "koi_period": 0.5, "koi_model_snr": 30.0 }));
        let text = explain(Variant::Koi, "CONFIRMED", 0.9, &r);
        assert!(text.starts_with("Confirmed Exoplanet - "));
        assert!(text.ends_with(
            " Feature insights: Very deep transit suggests large planetary radius or small host star. \
             Ultra-short orbital period typical of hot planets close to their host stars."
        ));
    }

    #[test]
    fn test_unknown_class_uses_default_text() {
        let text = explain(Variant::Toi, "XX", 0.5, &Record::new());
        assert_eq!(text, "Classification completed based on transit characteristics.");
    }

    #[test]
    fn test_k2_host_star() {
        let text = explain(Variant::K2, "CANDIDATE", 0.5, &record(json!({ "st_teff": 3500 })));
        assert!(text.ends_with("Feature insights: Cool host star (M-dwarf)."));
    }

    #[test]
    fn test_custom_key_factors() {
        let r = record(json!({ "a": 5000, "b": 0.01, "c": 3.0, "d": 99999 }));
        let text = custom_explanation("x", 0.873, &r);
        assert_eq!(
            text,
            "Predicted as 'x' with 87.3% confidence. Key factors: High a (5000), Very low b (0.01)."
        );
    }

    #[test]
    fn test_custom_factors_follow_request_order() {
        let r = record(json!({ "zeta": 2000, "mass": 5.0, "alpha": 0.01, "beta": 3000 }));
        let text = custom_explanation("x", 0.5, &r);
        assert_eq!(
            text,
            "Predicted as 'x' with 50.0% confidence. Key factors: High zeta (2000), Very low alpha (0.01)."
        );
    }

    #[test]
    fn test_custom_without_factors() {
        let r = record(json!({ "a": 5.0, "name": "foo" }));
        let text = custom_explanation("x", 1.0, &r);
        assert_eq!(text, "Predicted as 'x' with 100.0% confidence. Based on the trained custom model.");
    }
}
