//! Preset interaction graphs.
//!
//! Benchmarks are keyed by qubit count in `graphs.json`: ten random
//! 3-regular graphs per size. Missing sizes are generated on demand with
//! seeded pairing-model sampling and written back to `graphs_new.json`.

use rac_core::{RacError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Edge lists indexed by graph-size string.
pub type GraphSets = BTreeMap<String, Vec<Vec<(usize, usize)>>>;

pub const GRAPHS_PER_SIZE: usize = 10;
const DEGREE: usize = 3;
const MAX_SAMPLING_ATTEMPTS: usize = 1000;

/// Loads `path` if it exists, otherwise starts an empty store.
pub fn load(path: &Path) -> Result<GraphSets> {
    if !path.exists() {
        return Ok(GraphSets::new());
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save(path: &Path, graphs: &GraphSets) -> Result<()> {
    fs::write(path, serde_json::to_string(graphs)?)?;
    Ok(())
}

/// Returns graph `id` of the given size, generating (and recording) the
/// whole size class when it is missing from the store.
pub fn fetch(graphs: &mut GraphSets, size: usize, id: usize) -> Result<(Vec<(usize, usize)>, bool)> {
    if id >= GRAPHS_PER_SIZE {
        return Err(RacError::schema(format!(
            "graph index {id} out of range 0..{GRAPHS_PER_SIZE}"
        )));
    }
    let key = size.to_string();
    if let Some(set) = graphs.get(&key) {
        if let Some(edges) = set.get(id) {
            return Ok((edges.clone(), false));
        }
    }
    let mut set = Vec::with_capacity(GRAPHS_PER_SIZE);
    for seed in 0..GRAPHS_PER_SIZE {
        set.push(random_regular_graph(size, seed as u64)?);
    }
    let edges = set[id].clone();
    graphs.insert(key, set);
    Ok((edges, true))
}

/// Samples a simple 3-regular graph on `n` vertices via the pairing
/// model: shuffle three stubs per vertex, pair them up, retry on
/// self-loops or parallel edges.
pub fn random_regular_graph(n: usize, seed: u64) -> Result<Vec<(usize, usize)>> {
    if n * DEGREE % 2 != 0 || n <= DEGREE {
        return Err(RacError::schema(format!(
            "no 3-regular graph on {n} vertices"
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stubs: Vec<usize> = (0..n).flat_map(|v| std::iter::repeat(v).take(DEGREE)).collect();

    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        stubs.shuffle(&mut rng);
        let mut seen = HashSet::with_capacity(n * DEGREE / 2);
        let mut edges = Vec::with_capacity(n * DEGREE / 2);
        let mut simple = true;
        for pair in stubs.chunks_exact(2) {
            let (a, b) = (pair[0], pair[1]);
            if a == b || !seen.insert((a.min(b), a.max(b))) {
                simple = false;
                break;
            }
            edges.push((a, b));
        }
        if simple {
            return Ok(edges);
        }
    }
    Err(RacError::schema(format!(
        "failed to sample a simple 3-regular graph on {n} vertices"
    )))
}
