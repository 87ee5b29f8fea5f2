//! Discount curves.

mod flat;
mod table;
mod traits;

pub use flat::FlatCurve;
pub use table::DiscountFactorTable;
pub use traits::DiscountCurve;
