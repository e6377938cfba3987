//! Pressure-sinkage and shear response of a single contacted node.
//!
//! Normal pressure follows an elastic-plastic scheme: an elastic trial
//! against the current plastic sinkage, corrected onto the Bekker yield
//! curve whenever the trial exceeds the highest pressure seen so far.
//! Shear stress is the Mohr-Coulomb limit scaled by the Janosi-Hanamoto
//! saturation of the accumulated shear displacement.

use glam::DVec3;
use scm_core::{ContactableSoilData, ResolvedSoil};
use scm_grid::GridNode;

/// Everything the node update needs besides the node itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactInput {
    /// Soil parameters at the node.
    pub soil: ResolvedSoil,
    /// Hit height along the reference plane normal.
    pub hit_level: f64,
    /// Shape factor of the node's patch.
    pub oob: f64,
    /// Velocity of the contacted surface at the node (world frame).
    pub velocity: DVec3,
    /// Undeformed node normal (world frame).
    pub normal: DVec3,
    /// Step size; must be positive.
    pub dt: f64,
    /// Area attributed to the node.
    pub cell_area: f64,
    /// Interaction properties declared by the contacted entity.
    pub entity_soil: Option<ContactableSoilData>,
}

/// Force exerted on the contacted entity at one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactForce {
    /// Component along the node normal.
    pub normal: DVec3,
    /// Component opposing the tangential velocity.
    pub tangential: DVec3,
}

impl ContactForce {
    /// Resultant force.
    pub fn total(&self) -> DVec3 {
        self.normal + self.tangential
    }
}

fn janosi(tau_max: f64, kshear: f64, j: f64) -> f64 {
    tau_max * (1.0 - (-kshear / j).exp())
}

/// Advance `node` by one step of contact.
///
/// Returns `None` when the elastic trial pressure is negative: contact
/// was lost, `sigma` is cleared and nothing else about the node changes.
pub fn update_node(node: &mut GridNode, input: &ContactInput) -> Option<ContactForce> {
    let soil = &input.soil;
    let ca = node.normal.z;

    node.hit_level = input.hit_level;
    let offset = ca * (node.level_initial - node.hit_level);

    node.sigma = soil.k * (offset - node.sinkage_plastic);
    if node.sigma < 0.0 {
        node.sigma = 0.0;
        return None;
    }

    let n = input.normal;
    let vn = input.velocity.dot(n);
    let t = -(input.velocity - vn * n).normalize_or_zero();

    node.sinkage = offset;
    node.level = node.hit_level;
    node.kshear += input.velocity.dot(-t) * input.dt;

    if node.sigma > node.sigma_yield {
        node.sigma = (input.oob * soil.kc + soil.kphi) * node.sinkage.powf(soil.n);
        node.sigma_yield = node.sigma;
        let previous = node.sinkage_plastic;
        node.sinkage_plastic = node.sinkage - node.sigma / soil.k;
        node.step_plastic_flow = (node.sinkage_plastic - previous) / input.dt;
    }

    node.sinkage_elastic = node.sinkage - node.sinkage_plastic;

    node.sigma += -vn * soil.r;

    let tau_max = soil.cohesion + node.sigma * soil.mu;
    node.tau = janosi(tau_max, node.kshear, soil.janosi);

    let shear = match &input.entity_soil {
        Some(es) => {
            let c_tau_max = es.mohr_cohesion + node.sigma * es.mohr_mu;
            let c_tau = janosi(c_tau_max, node.kshear, es.janosi_shear);
            (1.0 - es.area_ratio) * node.tau + es.area_ratio * c_tau
        }
        None => node.tau,
    };

    let force = ContactForce {
        normal: n * input.cell_area * node.sigma,
        tangential: t * input.cell_area * shear,
    };

    node.level = node.level_initial - node.sinkage / ca;
    Some(force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scm_core::SoilParameters;

    fn input(hit_level: f64) -> ContactInput {
        ContactInput {
            soil: SoilParameters::default().resolve(),
            hit_level,
            oob: 0.0,
            velocity: DVec3::ZERO,
            normal: DVec3::Z,
            dt: 1e-3,
            cell_area: 0.01,
            entity_soil: None,
        }
    }

    #[test]
    fn first_touch_yields_onto_bekker_curve() {
        let mut node = GridNode::pristine(0.0, DVec3::Z);
        let f = update_node(&mut node, &input(-0.05)).expect("in contact");
        let soil = SoilParameters::default().resolve();
        let sigma = soil.kphi * 0.05f64.powf(soil.n);
        assert_eq!(node.sinkage, 0.05);
        assert_eq!(node.sigma_yield, sigma);
        assert_eq!(node.sinkage_plastic, 0.05 - sigma / soil.k);
        assert_eq!(node.sinkage_elastic, node.sinkage - node.sinkage_plastic);
        assert_eq!(node.step_plastic_flow, node.sinkage_plastic / 1e-3);
        assert!((node.level - (-0.05)).abs() < 1e-15);
        assert!((f.normal.z - 0.01 * sigma).abs() < 1e-9);
        // No motion: no shear displacement, tau stays at zero.
        assert_eq!(node.kshear, 0.0);
        assert_eq!(f.tangential, DVec3::ZERO);
    }

    #[test]
    fn sloped_node_projects_depth_onto_normal() {
        let normal = DVec3::new(0.6, 0.0, 0.8);
        let mut node = GridNode::pristine(0.2, normal);
        let mut inp = input(0.15);
        inp.normal = normal;
        let f = update_node(&mut node, &inp).expect("in contact");
        // Vertical depth 0.05, measured along a normal tilted by acos(0.8).
        assert!((node.sinkage - 0.8 * 0.05).abs() < 1e-15);
        assert!((node.level - 0.15).abs() < 1e-15);
        assert!((node.sinkage_elastic + node.sinkage_plastic - node.sinkage).abs() < 1e-15);
        assert!((f.normal.x / f.normal.z - 0.75).abs() < 1e-12);
    }

    #[test]
    fn negative_trial_clears_sigma_only() {
        let mut node = GridNode::pristine(0.0, DVec3::Z);
        node.sinkage_plastic = 0.02;
        node.sigma_yield = 5e4;
        node.kshear = 0.3;
        let mut inp = input(-0.01);
        // Pressing down fast would add damping if the node were not skipped.
        inp.velocity = DVec3::new(0.0, 0.0, -2.0);
        inp.soil.r = 1e5;
        let before = node;
        assert!(update_node(&mut node, &inp).is_none());
        assert_eq!(node.sigma, 0.0);
        assert_eq!(node.sigma_yield, before.sigma_yield);
        assert_eq!(node.kshear, before.kshear);
        assert_eq!(node.level, before.level);
        assert_eq!(node.sinkage_plastic, before.sinkage_plastic);
    }

    #[test]
    fn reload_below_yield_stays_elastic() {
        let mut node = GridNode::pristine(0.0, DVec3::Z);
        update_node(&mut node, &input(-0.05)).expect("in contact");
        let yield_before = node.sigma_yield;
        let plastic_before = node.sinkage_plastic;
        node.reset_transient();
        // Slight unload: trial pressure below the yield surface.
        let f = update_node(&mut node, &input(-0.0499)).expect("still in contact");
        assert_eq!(node.sigma_yield, yield_before);
        assert_eq!(node.sinkage_plastic, plastic_before);
        assert_eq!(node.step_plastic_flow, 0.0);
        let k = SoilParameters::default().resolve().k;
        assert!((node.sigma - k * (0.0499 - plastic_before)).abs() < 1e-6);
        assert!(f.normal.z > 0.0);
    }

    #[test]
    fn sliding_builds_shear_opposing_motion() {
        let mut node = GridNode::pristine(0.0, DVec3::Z);
        let mut inp = input(-0.05);
        inp.velocity = DVec3::new(1.0, 0.0, 0.0);
        let f = update_node(&mut node, &inp).expect("in contact");
        assert!((node.kshear - 1e-3).abs() < 1e-15);
        assert!(node.tau > 0.0);
        assert!(f.tangential.x < 0.0);
        assert_eq!(f.tangential.y, 0.0);
    }

    #[test]
    fn damping_adds_to_pressure_when_sinking() {
        let mut a = GridNode::pristine(0.0, DVec3::Z);
        let mut b = a;
        let mut inp = input(-0.05);
        update_node(&mut a, &inp).expect("in contact");
        inp.velocity = DVec3::new(0.0, 0.0, -0.5);
        inp.soil.r = 1e4;
        update_node(&mut b, &inp).expect("in contact");
        assert!((b.sigma - a.sigma - 0.5 * 1e4).abs() < 1e-6);
        // The yield surface records the pre-damping pressure.
        assert_eq!(a.sigma_yield, b.sigma_yield);
    }

    #[test]
    fn entity_override_blends_shear() {
        let mut a = GridNode::pristine(0.0, DVec3::Z);
        let mut b = a;
        let mut inp = input(-0.05);
        inp.velocity = DVec3::new(0.5, 0.0, 0.0);
        let plain = update_node(&mut a, &inp).expect("in contact");
        inp.entity_soil = Some(ContactableSoilData::new(1.0, 0.0, 0.0, 0.01));
        let blended = update_node(&mut b, &inp).expect("in contact");
        // Frictionless, cohesionless override on the whole area: no shear.
        assert!(plain.tangential.length() > 0.0);
        assert!(blended.tangential.length() < 1e-12);
        assert_eq!(a.tau, b.tau);
    }

    #[test]
    fn bekker_cohesive_term_uses_shape_factor() {
        let mut a = GridNode::pristine(0.0, DVec3::Z);
        let mut b = a;
        let mut inp = input(-0.05);
        inp.soil.kc = 1e5;
        update_node(&mut a, &inp).expect("in contact");
        inp.oob = 4.0;
        update_node(&mut b, &inp).expect("in contact");
        let expected = (4.0 * 1e5 + inp.soil.kphi) * 0.05f64.powf(inp.soil.n);
        assert!((b.sigma_yield - expected).abs() < 1e-6);
        assert!(b.sigma_yield > a.sigma_yield);
    }

    proptest! {
        #[test]
        fn yield_pressure_never_decreases(depths in prop::collection::vec(-0.05f64..0.12, 1..40)) {
            let mut node = GridNode::pristine(0.0, DVec3::Z);
            let mut last_yield = 0.0;
            for d in depths {
                node.reset_transient();
                let _ = update_node(&mut node, &input(-d));
                prop_assert!(node.sigma_yield >= last_yield);
                prop_assert!(node.sigma >= 0.0);
                last_yield = node.sigma_yield;
            }
        }
    }
}
