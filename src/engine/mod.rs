//! RUSLE Factor Engine (C2): `A = R · K · LS · C · P`.

mod c_factor;
mod composite;
mod k_factor;
mod ls_factor;
mod p_factor;
mod r_factor;
mod rainfall;
mod stats;

pub use c_factor::c_factor;
pub use composite::{compute, RusleFactorStats, RusleResult, RusleSample};
pub use k_factor::{k_factor, SoilInputs};
pub use ls_factor::ls_factor;
pub use p_factor::{p_factor, LandCoverClass};
pub use r_factor::r_factor;
pub use rainfall::{rainfall_trend, RainfallStats};
pub use stats::{
    factor_stats, severity_distribution, severity_distribution_areas, soil_loss_stats, FactorStats,
    SeverityBand, SoilLossStats, SEVERITY_BOUNDARIES, SEVERITY_LABELS,
};
