//! Domain model, wire protocol and validation rules shared by the intake crates.

pub mod catalog;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod validation;
