//! Decayed Beta smoothing of estimator outputs.

use super::traits::BetaParams;
use serde::{Deserialize, Serialize};

/// How an estimator output is turned into a visible confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMode {
    /// `clamp(1 - 2 * std, 0, 1)`.
    #[default]
    Variance,
    /// `S / (S + strength_max)`.
    Strength,
    /// Average of the two.
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Multiplier applied to the persistent counts before each update.
    pub decay: f64,
    /// Cap on the evidence mass one update may add.
    pub kappa_max: f64,
    pub confidence_mode: ConfidenceMode,
    pub strength_max: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            decay: 0.999,
            kappa_max: 2.0,
            confidence_mode: ConfidenceMode::Variance,
            strength_max: 50.0,
        }
    }
}

/// Summary statistics of one estimator output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaMoments {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub strength: f64,
    pub confidence: f64,
}

impl BetaMoments {
    pub fn of(params: BetaParams, config: &TrackerConfig) -> Self {
        let strength = params.strength();
        let (mean, variance) = if strength <= 0.0 {
            (0.5, 1.0 / 12.0)
        } else {
            (
                params.alpha / strength,
                params.alpha * params.beta / (strength * strength * (strength + 1.0)),
            )
        };
        let std = variance.max(0.0).sqrt();

        let from_variance = (1.0 - 2.0 * std).clamp(0.0, 1.0);
        let from_strength = if strength > 0.0 {
            strength / (strength + config.strength_max)
        } else {
            0.0
        };
        let confidence = match config.confidence_mode {
            ConfidenceMode::Variance => from_variance,
            ConfidenceMode::Strength => from_strength,
            ConfidenceMode::Hybrid => 0.5 * from_variance + 0.5 * from_strength,
        };

        Self {
            mean,
            variance,
            std,
            strength,
            confidence,
        }
    }
}

/// Persistent pseudo-counts for one trait. Unset until the first update,
/// which starts from the uniform prior.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Posterior {
    counts: Option<BetaParams>,
}

impl Posterior {
    pub fn counts(&self) -> Option<BetaParams> {
        self.counts
    }

    pub fn clear(&mut self) {
        self.counts = None;
    }

    /// Folds one observation in and returns the smoothed mean.
    pub fn absorb(&mut self, observed: &BetaMoments, config: &TrackerConfig) -> f64 {
        let mut counts = self.counts.unwrap_or(BetaParams::UNIFORM);
        counts.alpha *= config.decay;
        counts.beta *= config.decay;

        let kappa = observed.strength.min(config.kappa_max);
        counts.alpha += kappa * observed.mean;
        counts.beta += kappa * (1.0 - observed.mean);

        self.counts = Some(counts);
        counts.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_tracks_certainty() {
        let config = TrackerConfig::default();
        let sharp = BetaMoments::of(BetaParams::new(1e6, 1e6), &config);
        assert!(sharp.confidence > 0.99, "{}", sharp.confidence);
        assert!((sharp.mean - 0.5).abs() < 1e-9);

        let vague = BetaMoments::of(BetaParams::new(1e-3, 1e-3), &config);
        assert!(vague.confidence < 0.01, "{}", vague.confidence);
    }

    #[test]
    fn degenerate_counts_use_uniform_moments() {
        let config = TrackerConfig::default();
        let moments = BetaMoments::of(BetaParams::new(0.0, 0.0), &config);
        assert_eq!(moments.mean, 0.5);
        assert_eq!(moments.variance, 1.0 / 12.0);
    }

    #[test]
    fn strength_and_hybrid_modes() {
        let mut config = TrackerConfig {
            confidence_mode: ConfidenceMode::Strength,
            ..TrackerConfig::default()
        };
        let params = BetaParams::new(30.0, 20.0);
        let strength = BetaMoments::of(params, &config).confidence;
        assert!((strength - 0.5).abs() < 1e-12);

        config.confidence_mode = ConfidenceMode::Variance;
        let variance = BetaMoments::of(params, &config).confidence;
        config.confidence_mode = ConfidenceMode::Hybrid;
        let hybrid = BetaMoments::of(params, &config).confidence;
        assert!((hybrid - 0.5 * (strength + variance)).abs() < 1e-12);
    }

    #[test]
    fn posterior_starts_uniform_and_caps_evidence() {
        let config = TrackerConfig::default();
        let mut posterior = Posterior::default();
        assert!(posterior.counts().is_none());

        let observed = BetaMoments::of(BetaParams::new(90.0, 10.0), &config);
        let mean = posterior.absorb(&observed, &config);
        let counts = posterior.counts().unwrap();
        // Strength 100 is capped at kappa_max = 2.
        assert!((counts.alpha - (0.999 + 1.8)).abs() < 1e-9);
        assert!((counts.beta - (0.999 + 0.2)).abs() < 1e-9);
        assert!((mean - counts.alpha / counts.strength()).abs() < 1e-12);
    }
}
