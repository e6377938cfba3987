//! Soil parameter records.
//!
//! [`SoilParameters`] is the user-facing form (friction angle in degrees,
//! stiffness as given). [`ResolvedSoil`] is what the contact model
//! consumes: friction converted to a coefficient and degenerate values
//! clamped to the nearest valid ones.

/// Smallest Janosi shear length accepted; smaller values are clamped.
pub const MIN_JANOSI_SHEAR: f64 = 1e-9;

/// Parameters of the Bekker / Mohr-Coulomb / Janosi-Hanamoto soil model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoilParameters {
    /// Frictional modulus `Kphi` of the Bekker relation.
    pub bekker_kphi: f64,
    /// Cohesive modulus `Kc` of the Bekker relation.
    pub bekker_kc: f64,
    /// Sinkage exponent `n` of the Bekker relation (usually 0.6 to 1.8).
    pub bekker_n: f64,
    /// Mohr-Coulomb cohesion, in Pa.
    pub mohr_cohesion: f64,
    /// Mohr-Coulomb friction angle, in degrees.
    pub mohr_friction_deg: f64,
    /// Shear length `J` of the Janosi-Hanamoto relation, in m.
    pub janosi_shear: f64,
    /// Elastic stiffness per unit area, in Pa/m. Never below `bekker_kphi`.
    pub elastic_k: f64,
    /// Vertical damping per unit area, in Pa·s/m.
    pub damping_r: f64,
}

impl Default for SoilParameters {
    fn default() -> Self {
        Self {
            bekker_kphi: 2e6,
            bekker_kc: 0.0,
            bekker_n: 1.1,
            mohr_cohesion: 50.0,
            mohr_friction_deg: 20.0,
            janosi_shear: 0.01,
            elastic_k: 5e7,
            damping_r: 0.0,
        }
    }
}

impl SoilParameters {
    /// Convert to the form used by the contact model, clamping silently.
    ///
    /// - `elastic_k` is raised to `bekker_kphi` if it is smaller.
    /// - `janosi_shear` is raised to [`MIN_JANOSI_SHEAR`].
    /// - The friction angle becomes `mu = tan(angle)`.
    pub fn resolve(&self) -> ResolvedSoil {
        ResolvedSoil {
            kphi: self.bekker_kphi,
            kc: self.bekker_kc,
            n: self.bekker_n,
            cohesion: self.mohr_cohesion,
            mu: self.mohr_friction_deg.to_radians().tan(),
            janosi: self.janosi_shear.max(MIN_JANOSI_SHEAR),
            k: self.elastic_k.max(self.bekker_kphi),
            r: self.damping_r,
        }
    }
}

/// Soil parameters ready for use by the contact model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedSoil {
    /// Frictional modulus.
    pub kphi: f64,
    /// Cohesive modulus.
    pub kc: f64,
    /// Sinkage exponent.
    pub n: f64,
    /// Cohesion, in Pa.
    pub cohesion: f64,
    /// Friction coefficient, `tan(friction angle)`.
    pub mu: f64,
    /// Janosi shear length (strictly positive).
    pub janosi: f64,
    /// Elastic stiffness (at least `kphi`).
    pub k: f64,
    /// Damping coefficient.
    pub r: f64,
}

/// Soil-contactable interaction properties attached to one entity.
///
/// On the fraction `area_ratio` of the contact area, shear is computed
/// with these parameters instead of the soil-soil ones; the two shear
/// stresses are blended by area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactableSoilData {
    /// Fraction of the contact area governed by these parameters, in `[0, 1]`.
    pub area_ratio: f64,
    /// Cohesion, in Pa.
    pub mohr_cohesion: f64,
    /// Friction coefficient, `tan(friction angle)`.
    pub mohr_mu: f64,
    /// Janosi shear length, in m.
    pub janosi_shear: f64,
}

impl ContactableSoilData {
    /// Build from a friction angle in degrees.
    ///
    /// `area_ratio` is clamped to `[0, 1]` and `janosi_shear` to
    /// [`MIN_JANOSI_SHEAR`].
    pub fn new(area_ratio: f64, mohr_cohesion: f64, mohr_friction_deg: f64, janosi_shear: f64) -> Self {
        Self {
            area_ratio: area_ratio.clamp(0.0, 1.0),
            mohr_cohesion,
            mohr_mu: mohr_friction_deg.to_radians().tan(),
            janosi_shear: janosi_shear.max(MIN_JANOSI_SHEAR),
        }
    }
}
