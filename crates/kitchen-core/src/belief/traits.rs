use core::fmt;
use core::ops::{Index, IndexMut};
use serde::{Deserialize, Serialize};

/// Latent partner-trust dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Ability,
    Benevolence,
    Integrity,
}

impl Trait {
    pub const ALL: [Trait; 3] = [Trait::Ability, Trait::Benevolence, Trait::Integrity];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Trait::Ability => "ability",
            Trait::Benevolence => "benevolence",
            Trait::Integrity => "integrity",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Beta distribution pseudo-counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaParams {
    pub const UNIFORM: BetaParams = BetaParams {
        alpha: 1.0,
        beta: 1.0,
    };

    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn strength(&self) -> f64 {
        self.alpha + self.beta
    }

    /// `alpha / (alpha + beta)`, or 0.5 when the strength is not positive.
    pub fn mean(&self) -> f64 {
        let strength = self.strength();
        if strength > 0.0 {
            self.alpha / strength
        } else {
            0.5
        }
    }
}

/// One [`BetaParams`] per trait, indexable by [`Trait`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitParams(pub [BetaParams; 3]);

impl TraitParams {
    pub const fn uniform() -> Self {
        Self([BetaParams::UNIFORM; 3])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, BetaParams)> + '_ {
        Trait::ALL.into_iter().map(|t| (t, self.0[t.index()]))
    }
}

impl Index<Trait> for TraitParams {
    type Output = BetaParams;

    fn index(&self, index: Trait) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl IndexMut<Trait> for TraitParams {
    fn index_mut(&mut self, index: Trait) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}
