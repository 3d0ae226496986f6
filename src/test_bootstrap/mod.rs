#![cfg(test)]

//! Test-only bootstrap helpers shared by unit and integration tests.

pub mod logging;
