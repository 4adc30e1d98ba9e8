//! Short-Sale Volume Ingestion Library
//!
//! This library provides the core components for downloading FINRA's daily
//! Reg SHO short-sale volume files, parsing them into typed records, and
//! persisting them for dashboard queries.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
