// src/core/mod.rs

pub mod check;
pub mod converters;
pub mod factory;
pub mod invocation;
pub mod joining;
pub mod nodes;
pub mod registry;
pub mod result_converters;
pub mod value;
