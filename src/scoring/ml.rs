//! Model scoring seam
//!
//! The pipeline only sees this trait. Whether anything real sits behind it
//! is a deployment concern; the default build ships the disabled scorer.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MlPrediction {
    /// 0-100, same scale as the rule score
    pub score: f64,
    /// 0-1
    pub confidence: f64,
}

pub trait MlScorer: Send + Sync {
    /// `None` means the model abstains for this candidate
    fn predict(&self, features: &FeatureVector) -> Option<MlPrediction>;
}

/// No-model default: always abstains
#[derive(Debug, Default)]
pub struct DisabledScorer;

impl MlScorer for DisabledScorer {
    fn predict(&self, _features: &FeatureVector) -> Option<MlPrediction> {
        None
    }
}

#[cfg(test)]
pub(crate) struct FixedScorer(pub MlPrediction);

#[cfg(test)]
impl MlScorer for FixedScorer {
    fn predict(&self, _features: &FeatureVector) -> Option<MlPrediction> {
        Some(self.0)
    }
}
