//! IMOEX Lab Core — artifacts, storage tiers, origin collaborators, text features.
//!
//! This crate holds everything the reconciliation pipeline touches per date:
//! - Domain types (date keys, artifact kinds, typed raw artifacts)
//! - Versioned artifact codec with a legacy compatibility path
//! - Local filesystem tier and remote object-store tier
//! - Origin collaborators (news feed with fixed-delay retry, MOEX ISS candles)
//! - Text cleaning and TF-IDF feature transform

pub mod data;
pub mod domain;
pub mod features;
