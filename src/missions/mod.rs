//! Deployment variants
//!
//! Three fixed-schema survey missions (TOI, KOI, K2) share one process-wide
//! model each; the custom variant accepts any table and keeps a model per
//! tenant.

mod explain;

pub use explain::{custom_explanation, explain};

use crate::error::ClassifierError;
use crate::preprocessing::SelectionConfig;
use crate::training::{ModelKind, ModelSpec, TrainingPlan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which deployment a server or CLI run serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Custom,
    Toi,
    Koi,
    K2,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Custom, Variant::Toi, Variant::Koi, Variant::K2];

    /// Lowercase name, also the artifact directory name
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Custom => "custom",
            Variant::Toi => "toi",
            Variant::Koi => "koi",
            Variant::K2 => "k2",
        }
    }

    /// Name reported as `model_type` and used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Custom => "Custom",
            Variant::Toi => "TOI",
            Variant::Koi => "KOI",
            Variant::K2 => "K2",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Variant::Toi => 5001,
            Variant::Koi => 5002,
            Variant::K2 => 5003,
            Variant::Custom => 5004,
        }
    }

    /// Environment variable overriding the port
    pub fn port_env_var(&self) -> &'static str {
        match self {
            Variant::Toi => "TOI_MODEL_PORT",
            Variant::Koi => "KOI_MODEL_PORT",
            Variant::K2 => "K2_MODEL_PORT",
            Variant::Custom => "CUSTOM_MODEL_PORT",
        }
    }

    /// Fixed schema of a mission; `None` for the custom variant
    pub fn profile(&self) -> Option<&'static MissionProfile> {
        match self {
            Variant::Custom => None,
            Variant::Toi => Some(&TOI),
            Variant::Koi => Some(&KOI),
            Variant::K2 => Some(&K2),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Variant::Custom)
    }

    /// Training plan for this variant
    pub fn training_plan(&self, kind: Option<ModelKind>) -> TrainingPlan {
        match self.profile() {
            Some(profile) => profile.training_plan(kind.unwrap_or(ModelKind::Ensemble)),
            None => TrainingPlan::custom(kind.unwrap_or(ModelKind::Ensemble)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Ok(Variant::Custom),
            "toi" => Ok(Variant::Toi),
            "koi" => Ok(Variant::Koi),
            "k2" => Ok(Variant::K2),
            other => Err(ClassifierError::InvalidParameter {
                name: "variant".to_string(),
                value: other.to_string(),
                reason: "expected one of custom, toi, koi, k2".to_string(),
            }),
        }
    }
}

/// How feature selection is configured for a mission
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionProfile {
    /// Top 15 by F score once there are more than 10 features
    TopK,
    /// Drop constant and highly correlated features, then keep the top `k`
    Pruned { k: usize },
}

/// Fixed schema and training choices of one survey mission
#[derive(Debug, Clone, PartialEq)]
pub struct MissionProfile {
    pub features: &'static [&'static str],
    /// Target columns probed in order
    pub targets: &'static [&'static str],
    pub normalize_target: bool,
    pub selection: SelectionProfile,
    pub balance_threshold: f64,
    /// Fraction of labelled rows held out for evaluation
    pub holdout: f64,
}

impl MissionProfile {
    pub fn training_plan(&self, kind: ModelKind) -> TrainingPlan {
        let selection = match self.selection {
            SelectionProfile::TopK => SelectionConfig::default(),
            SelectionProfile::Pruned { k } => SelectionConfig::pruned(k),
        };

        TrainingPlan {
            target_column: None,
            target_candidates: Some(self.targets.iter().map(|s| s.to_string()).collect()),
            allowed_features: Some(self.features.iter().map(|s| s.to_string()).collect()),
            normalize_target: self.normalize_target,
            selection,
            balance_threshold: self.balance_threshold,
            model: ModelSpec::mission().with_kind(kind),
            holdout: Some(self.holdout),
            cv_folds: None,
            seed: 42,
        }
    }
}

pub static TOI: MissionProfile = MissionProfile {
    features: &[
        "pl_orbper", "pl_trandurh", "pl_trandep", "pl_rade", "pl_insol", "pl_eqt",
        "st_tmag", "st_dist", "st_teff", "st_logg", "st_rad",
    ],
    targets: &["tfopwg_disp"],
    normalize_target: false,
    selection: SelectionProfile::TopK,
    balance_threshold: 2.0,
    holdout: 0.2,
};

pub static KOI: MissionProfile = MissionProfile {
    features: &[
        "koi_period", "koi_impact", "koi_duration", "koi_depth", "koi_prad", "koi_teq",
        "koi_insol", "koi_model_snr", "koi_steff", "koi_slogg", "koi_srad", "koi_kepmag",
    ],
    targets: &["koi_disposition", "koi_pdisposition"],
    normalize_target: true,
    selection: SelectionProfile::Pruned { k: 10 },
    balance_threshold: 1.0,
    holdout: 0.2,
};

pub static K2: MissionProfile = MissionProfile {
    features: &[
        "pl_orbper", "pl_orbsmax", "pl_rade", "pl_bmasse", "pl_orbeccen", "pl_insol", "pl_eqt",
        "st_teff", "st_rad", "st_mass", "st_met", "st_logg", "sy_dist", "sy_vmag",
    ],
    targets: &["disposition", "soltype"],
    normalize_target: false,
    selection: SelectionProfile::TopK,
    balance_threshold: 2.0,
    holdout: 0.2,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parsing_and_ports() {
        assert_eq!("KOI".parse::<Variant>().unwrap(), Variant::Koi);
        assert!("tess".parse::<Variant>().is_err());
        let ports: Vec<u16> = Variant::ALL.iter().map(Variant::default_port).collect();
        assert_eq!(ports, vec![5004, 5001, 5002, 5003]);
    }

    #[test]
    fn test_mission_plans() {
        let koi = Variant::Koi.training_plan(None);
        assert!(koi.normalize_target);
        assert_eq!(koi.balance_threshold, 1.0);
        assert_eq!(koi.selection.k, 10);
        assert!(koi.selection.drop_constant);
        assert_eq!(koi.model.weights, Some(vec![3.0, 2.0, 1.0]));
        assert_eq!(koi.holdout, Some(0.2));

        let toi = Variant::Toi.training_plan(Some(ModelKind::Bagged));
        assert_eq!(toi.model.kind, ModelKind::Bagged);
        assert_eq!(toi.selection.k, 15);
        assert_eq!(toi.target_candidates.unwrap(), vec!["tfopwg_disp"]);
    }

    #[test]
    fn test_custom_has_no_profile() {
        assert!(Variant::Custom.profile().is_none());
        let plan = Variant::Custom.training_plan(None);
        assert!(plan.allowed_features.is_none());
        assert_eq!(plan.cv_folds, Some(5));
    }
}
