//! `pixelforge-api` — HTTP surface over the job service.

pub mod app;
pub mod config;
pub mod middleware;
