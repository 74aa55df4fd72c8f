// SKYLINE Core Library
// Copyright (c) 2026 Xing_The_Creator | SKYLINE

pub mod cleanup;
pub mod config;
pub mod error;
pub mod export;
pub mod imaging;
pub mod params;
pub mod server;
pub mod state;
pub mod store;
pub mod variation;
