//! smacross: moving-average crossover backtester.
//!
//! Hexagonal architecture: pure computation in [`domain`], port traits in
//! [`ports`], file-backed implementations in [`adapters`], orchestration in
//! [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
