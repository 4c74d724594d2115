//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Synchronous fixed-step batch runner."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use tracing::debug;

use crate::design::Design;
use crate::errors::{Result, SimError};
use crate::noise::NoiseSource;
use crate::session::SimulationSession;
use crate::snapshot::Snapshot;

/// Run `steps` snapshots of `design` without any timer.
///
/// `step_size` is in seconds; snapshot `i` is evaluated at `i * step_size`
/// seconds of simulated time, so results depend only on the design, the step
/// parameters and the noise source.
///
/// `steps` is not bounded here; callers taking it from the outside cap it
/// first.
pub fn run_batch(
    design: &Design,
    steps: usize,
    step_size: f64,
    noise: Box<dyn NoiseSource>,
) -> Result<Vec<Snapshot>> {
    if !(step_size.is_finite() && step_size > 0.0) {
        return Err(SimError::InvalidStepSize(step_size));
    }

    let mut session = SimulationSession::from_design(design, noise);
    session.start();
    let mut snapshots = Vec::new();
    for i in 0..steps {
        let time_ms = i as f64 * step_size * 1000.0;
        snapshots.push(session.simulate(time_ms)?);
    }
    session.stop();

    debug!(design = %design.id, steps, step_size, "batch run complete");
    Ok(snapshots)
}
