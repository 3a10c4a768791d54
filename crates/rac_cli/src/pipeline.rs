//! The compilation pipeline driver.
//!
//! Sequences scheduling, placement, and per-layer routing plus code
//! generation, stitching the per-stage instruction streams into one
//! program.

use rac_codegen::{CodeGen, InstRecord};
use rac_compile::{gates_by_layer, place, route_stage, schedule, verify};
use rac_core::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Wall-clock seconds spent in each stage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TimingReport {
    pub scheduling: f64,
    pub placement: f64,
    pub routing: f64,
    pub codegen: f64,
    pub total: f64,
}

/// Output of one compilation.
#[derive(Debug)]
pub struct SolveResult {
    /// The stitched instruction stream, with snapshots when `full_code`
    pub records: Vec<InstRecord>,
    pub timing: TimingReport,
    /// Number of scheduled interaction layers
    pub num_layers: usize,
}

impl SolveResult {
    /// The stream with snapshots stripped (the compact artifact).
    pub fn compact_records(&self) -> Vec<InstRecord> {
        let mut records = self.records.clone();
        for r in &mut records {
            r.strip_state();
        }
        records
    }
}

/// Compiles two-qubit gate programs onto a neutral-atom array.
#[derive(Debug, Default)]
pub struct RacPipeline {
    chip: Option<ChipGeometry>,
    program: Option<Program>,
    initial_mapping: Option<Vec<Site>>,
    config: CompilerConfig,
}

impl RacPipeline {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Sets the chip dimensions: site columns/rows and AOD columns/rows.
    pub fn set_architecture(&mut self, nx: usize, ny: usize, nc: usize, nr: usize) {
        self.chip = Some(ChipGeometry::new(nx, ny, nc, nr));
    }

    /// Sets the gate list. Qubit count is inferred when `None`.
    pub fn set_program(
        &mut self,
        pairs: impl IntoIterator<Item = (usize, usize)>,
        num_qubits: Option<usize>,
    ) -> Result<()> {
        self.program = Some(Program::from_pairs(pairs, num_qubits)?);
        Ok(())
    }

    /// Seeds the initial mapping instead of running the placer.
    pub fn set_initial_mapping(&mut self, mapping: Vec<Site>) {
        self.initial_mapping = Some(mapping);
    }

    /// Runs the full pipeline and returns the instruction stream.
    pub fn solve(&self) -> Result<SolveResult> {
        let chip = self
            .chip
            .ok_or_else(|| RacError::schema("architecture not set"))?;
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RacError::schema("program not set"))?;
        let n_q = program.num_qubits;
        info!("start solving: {} qubits, {} gates", n_q, program.len());
        if n_q > chip.sites() {
            return Err(RacError::ChipTooSmall {
                nx: chip.nx,
                ny: chip.ny,
                n_q,
            });
        }

        let t_total = Instant::now();
        let mut timing = TimingReport::default();

        // scheduling
        let t = Instant::now();
        let schedule = schedule(program, self.config.dependency)?;
        if self.config.verify {
            verify::verify_scheduling(n_q, &program.gates, &schedule);
        }
        let layer_gates = gates_by_layer(&schedule, &program.gates);
        timing.scheduling = t.elapsed().as_secs_f64();
        info!(
            "scheduled {} gates into {} layers in {:.3}s",
            program.len(),
            layer_gates.len(),
            timing.scheduling
        );

        // initial placement
        let t = Instant::now();
        let mapping = match &self.initial_mapping {
            Some(mapping) => mapping.clone(),
            None if self.config.trivial_layout => trivial_mapping(chip.nx, n_q),
            None => place((chip.nx, chip.ny), n_q, &layer_gates, self.config.l2)?,
        };
        let mut placement = t.elapsed();
        if self.config.verify {
            verify::verify_mapping(&chip, n_q, &mapping);
        }
        info!("placement finished in {:.3}s", placement.as_secs_f64());

        // per-layer routing and code generation
        let mut routing = Duration::ZERO;
        let mut codegen = Duration::ZERO;
        let mut records: Vec<InstRecord> = Vec::new();
        let mut later_slms: Vec<(i64, i64)> = Vec::new();
        let mut current = mapping;
        for stage_idx in 0..layer_gates.len() {
            let t = Instant::now();
            let outcome = route_stage(&chip, n_q, stage_idx, &layer_gates, current, &self.config)?;
            routing += t.elapsed().saturating_sub(outcome.placement_time);
            placement += outcome.placement_time;
            current = outcome.final_mapping;

            let t = Instant::now();
            let stage = CodeGen::new(&chip, outcome.stage)?.build(false, self.config.full_code)?;
            let stage_records = stage.emit();
            if stage_idx == 0 {
                records.extend(stage_records);
            } else {
                // each stage re-emits an Init for its starting state; only
                // the first one belongs in the stitched stream
                later_slms.extend(stage.all_slms);
                records.extend(stage_records.into_iter().skip(1));
            }
            codegen += t.elapsed();
            info!(
                "solved interaction stage {}/{}",
                stage_idx + 1,
                layer_gates.len()
            );
        }

        // the surviving Init advertises every static trap the program uses
        if let Some(InstRecord::Init(init)) = records.first_mut() {
            init.add_slms(later_slms);
        }

        timing.placement = placement.as_secs_f64();
        timing.routing = routing.as_secs_f64();
        timing.codegen = codegen.as_secs_f64();
        timing.total = t_total.elapsed().as_secs_f64();
        info!("total solving time: {:.3}s", timing.total);

        Ok(SolveResult {
            records,
            timing,
            num_layers: layer_gates.len(),
        })
    }
}

/// Row-major identity layout.
fn trivial_mapping(nx: usize, n_qubits: usize) -> Vec<Site> {
    (0..n_qubits).map(|i| Site::new(i % nx, i / nx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_mapping_is_row_major() {
        let mapping = trivial_mapping(4, 6);
        assert_eq!(mapping[3], Site::new(3, 0));
        assert_eq!(mapping[4], Site::new(0, 1));
    }

    #[test]
    fn test_missing_program_is_schema_error() {
        let mut pipeline = RacPipeline::new(CompilerConfig::default());
        pipeline.set_architecture(4, 4, 4, 4);
        assert!(matches!(pipeline.solve(), Err(RacError::Schema(_))));
    }

    #[test]
    fn test_chip_too_small_is_fatal() {
        let mut pipeline = RacPipeline::new(CompilerConfig::default());
        pipeline.set_architecture(2, 2, 2, 2);
        pipeline.set_program([(0, 1)], Some(5)).unwrap();
        assert!(matches!(
            pipeline.solve(),
            Err(RacError::ChipTooSmall { n_q: 5, .. })
        ));
    }
}
