//! Per-step performance metrics for the soil model.
//!
//! [`StepMetrics`] captures phase timings and work counters for a single
//! step. It is returned inside every [`StepReport`] and the terrain keeps
//! a copy of the most recent one.

/// Timing and counter data collected during a single step.
///
/// All durations are in microseconds. Bulldozing sub-phase timers are
/// zero when bulldozing is disabled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Time spent updating active domains and their coordinate ranges.
    pub active_domains_us: u64,
    /// Time spent in the parallel probing stage.
    pub ray_testing_us: u64,
    /// Time spent probing plus merging hits into the store.
    pub ray_casting_us: u64,
    /// Time spent assembling contact patches.
    pub contact_patches_us: u64,
    /// Time spent in the soil model and force accumulation.
    pub contact_forces_us: u64,
    /// Time spent in all bulldozing phases.
    pub bulldozing_us: u64,
    /// Time spent raising patch boundaries.
    pub bulldozing_boundary_us: u64,
    /// Time spent building the erosion domain.
    pub bulldozing_domain_us: u64,
    /// Time spent relaxing the erosion domain.
    pub bulldozing_erosion_us: u64,
    /// Number of probes issued (quick-rejected probes excluded).
    pub ray_casts: usize,
    /// Number of distinct grid nodes hit.
    pub ray_hits: usize,
    /// Number of contact patches.
    pub contact_patches: usize,
    /// Number of nodes in the erosion domain.
    pub erosion_nodes: usize,
}

/// Outcome of one successful step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Metrics collected during the step.
    pub metrics: StepMetrics,
}
