//! Common utilities shared across macro modules.

pub mod syn_types;
