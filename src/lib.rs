// src/lib.rs

//! Bundlestore: static catalog generator for activity bundles

pub mod bundle;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
