//! Debt instruments and the structures that hold them.
//!
//! - [`tranche`]: a single priority-ranked slice of debt
//! - [`structure`]: the ordered capital structure
//! - [`reserve`]: DSRA and MRA reserve accounts
//! - [`phase`]: project phases and covenant thresholds
//! - [`hedge`]: interest-rate hedge overlays

pub mod hedge;
pub mod phase;
pub mod reserve;
pub mod structure;
pub mod tranche;

pub use hedge::{HedgeMode, HedgeOverlay};
pub use phase::{CovenantSchedule, PhaseSchedule, ProjectPhase};
pub use reserve::{DsraConfig, MaintenanceEvent, MraConfig, MraSchedule, ReserveAccount};
pub use structure::CapitalStructure;
pub use tranche::{Amortisation, AmortisationSchedule, Coupon, Seniority, Tranche};
