pub mod policy;

pub use policy::{
    Architecture, Extractor, MlpManifest, MlpPolicy, Policy, PolicyError, ScriptedCook,
};
