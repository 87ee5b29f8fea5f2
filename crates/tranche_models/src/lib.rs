//! # Tranche Models (L2: Business Logic)
//!
//! Definitions of the financed project and its debt.
//!
//! This crate provides:
//! - Deterministic baseline projections and their validation (`baseline`)
//! - Tranches, amortisation schedules and capital structures (`instruments`)
//! - Reserve accounts: DSRA and MRA (`instruments::reserve`)
//! - Project phases and covenant thresholds (`instruments::phase`)
//! - Interest-rate hedge overlays (`instruments::hedge`)
//! - Mean-reverting short rate and two-state regime chain (`models`)
//! - Structural asset-value parameters, credit state and recovery (`credit`)
//!
//! ## Design Principles
//!
//! - **Enum-based variants** (coupon, amortisation, hedge, regime, credit
//!   state) for static dispatch and explicit transition functions
//! - **Validate once**: every configuration type has a checked constructor so
//!   the scenario loop never sees invalid data
//! - **Serde-first configuration**: all inputs deserialise from TOML

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod baseline;
pub mod credit;
pub mod instruments;
pub mod models;
