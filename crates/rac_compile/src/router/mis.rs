//! Independent-set extraction from the motion-conflict graph.
//!
//! Three interchangeable solvers sit behind the `MisSolver` capability:
//! a greedy first-fit (assuming the vertices arrive pre-sorted by
//! priority), a seeded random-order maximal set, and the external
//! `redumis` maximum-independent-set binary.

use rac_core::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// Extracts an independent set of vertex ids from `n` vertices and the
/// given conflict edges.
pub trait MisSolver {
    fn solve(&mut self, n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>>;
}

fn adjacency(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for &(u, v) in edges {
        adj[u].push(v);
        adj[v].push(u);
    }
    adj
}

/// First-fit over vertex order: accept a vertex unless a previously
/// accepted neighbor blocked it. Maximal when vertices are pre-sorted by
/// descending priority.
#[derive(Debug, Default)]
pub struct GreedyFirstFit;

impl MisSolver for GreedyFirstFit {
    fn solve(&mut self, n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>> {
        let adj = adjacency(n, edges);
        let mut blocked = vec![false; n];
        let mut result = Vec::new();
        for v in 0..n {
            if blocked[v] {
                continue;
            }
            result.push(v);
            for &u in &adj[v] {
                blocked[u] = true;
            }
        }
        Ok(result)
    }
}

/// Maximal independent set grown in a seeded random vertex order.
#[derive(Debug)]
pub struct SeededMaximal {
    seed: u64,
}

impl SeededMaximal {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SeededMaximal {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MisSolver for SeededMaximal {
    fn solve(&mut self, n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>> {
        let adj = adjacency(n, edges);
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let mut blocked = vec![false; n];
        let mut result = Vec::new();
        for &v in &order {
            if blocked[v] {
                continue;
            }
            result.push(v);
            for &u in &adj[v] {
                blocked[u] = true;
            }
        }
        result.sort_unstable();
        Ok(result)
    }
}

/// External KaMIS `redumis` solver.
///
/// The conflict graph is written as `N M` followed by one 1-based neighbor
/// line per vertex; the output holds one `0`/`1` inclusion marker per
/// line. A non-zero exit or unreadable output is fatal.
#[derive(Debug)]
pub struct Redumis {
    dir: PathBuf,
    batch: usize,
}

impl Redumis {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            batch: 0,
        }
    }
}

impl MisSolver for Redumis {
    fn solve(&mut self, n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>> {
        let mut adj = adjacency(n, edges);
        for neighbors in &mut adj {
            neighbors.sort_unstable();
        }

        let tmp = self.dir.join("tmp");
        fs::create_dir_all(&tmp)?;
        let in_path = tmp.join(format!("mis_{}.in", self.batch));
        let out_path = tmp.join(format!("mis_{}.out", self.batch));
        let log_path = tmp.join(format!("mis_{}.log", self.batch));
        self.batch += 1;

        let mut input = fs::File::create(&in_path)?;
        writeln!(input, "{} {}", n, edges.len())?;
        for neighbors in &adj {
            let line: Vec<String> = neighbors.iter().map(|v| (v + 1).to_string()).collect();
            writeln!(input, "{}", line.join(" "))?;
        }
        drop(input);

        let output = Command::new(self.dir.join("redumis"))
            .arg(&in_path)
            .arg("--output")
            .arg(&out_path)
            .arg("--time_limit")
            .arg("3600")
            .output()
            .map_err(|e| RacError::mis_solver(format!("failed to launch redumis: {e}")))?;
        fs::write(&log_path, &output.stdout)?;
        if !output.status.success() {
            return Err(RacError::mis_solver(format!(
                "redumis exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let text = fs::read_to_string(&out_path).map_err(|e| {
            RacError::mis_solver(format!("missing output {}: {e}", out_path.display()))
        })?;
        Ok(text
            .lines()
            .enumerate()
            .filter(|(_, line)| line.starts_with('1'))
            .map(|(i, _)| i)
            .collect())
    }
}
