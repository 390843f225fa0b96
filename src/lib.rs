//! Filament - a self-hosted 3D model library
//!
//! This library provides account registration and management, the model
//! file authorization rules, federation mapping and the activity backfill.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod policy;
pub mod services;
