//! Error handling for the cardroom engines.

pub mod domain;

pub use domain::DomainError;
