//! Test utilities and helpers for the chunkrows crates.
//!
//! This crate provides:
//! - Data generation: deterministic Arrow record batches
//! - Parquet encoding of record batches into chunk payloads and files
//!
//! # Usage
//!
//! This crate is intended for the chunkrows test suites and development tools.

pub mod data_gen;
pub mod files;
