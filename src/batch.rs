use crate::construct::Construct;
use crate::error::AssemblyError;
use crate::recipe::{Assembler, Recipe};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One requested build: a recipe plus an optional filler seed (technical
/// replicate) and an optional explicit construct name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildRequest {
    pub recipe: Recipe,
    #[serde(default)]
    pub filler_seed: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl BuildRequest {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            filler_seed: None,
            name: None,
        }
    }

    pub fn construct_name(&self) -> String {
        match (&self.name, self.filler_seed) {
            (Some(name), _) => name.clone(),
            (None, Some(seed)) => format!("{}_seed{seed}", self.recipe.name()),
            (None, None) => self.recipe.name(),
        }
    }
}

/// Expands one recipe into numbered technical replicates, one per seed.
pub fn replicates(recipe: &Recipe, seeds: &[u64]) -> Vec<BuildRequest> {
    seeds
        .iter()
        .enumerate()
        .map(|(idx, seed)| BuildRequest {
            recipe: recipe.clone(),
            filler_seed: Some(*seed),
            name: Some(format!("{}_rep{}", recipe.name(), idx + 1)),
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct BuiltConstruct {
    pub name: String,
    pub filler_seed: Option<u64>,
    pub construct: Construct,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildFailure {
    pub name: String,
    pub error: AssemblyError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub built: Vec<BuiltConstruct>,
    pub failures: Vec<BuildFailure>,
}

/// Builds every request, isolating failures: a mis-assembled construct
/// aborts only its own build, and the rest of the batch proceeds. Builds
/// run in parallel since each owns its builder and filler cycler.
pub fn build_batch(assembler: &Assembler, requests: &[BuildRequest]) -> BatchOutcome {
    let results: Vec<(String, Option<u64>, Result<Construct, AssemblyError>)> = requests
        .par_iter()
        .map(|request| {
            (
                request.construct_name(),
                request.filler_seed,
                assembler.build_seeded(&request.recipe, request.filler_seed),
            )
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for (name, filler_seed, result) in results {
        match result {
            Ok(construct) => outcome.built.push(BuiltConstruct {
                name,
                filler_seed,
                construct,
            }),
            Err(error) => outcome.failures.push(BuildFailure { name, error }),
        }
    }
    outcome
}
