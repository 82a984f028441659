//! Command-line front end for the refcheck regression harness.

pub mod cli;
