//! Core storage logic for Ducket.
//!
//! This crate exposes one facade, [`storage::Bucket`], that performs list,
//! fetch, upload and delete against either an S3-compatible bucket or the
//! hosted Ducket service, using a shared `project/id` key scheme.
//!
//! # Modules
//!
//! - `storage` - Backend selection, both adapters, and structured failure reporting

pub mod storage;
