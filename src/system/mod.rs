// src/system/mod.rs

pub mod environment;
pub mod executor;
pub mod interactive;
