//! Core模块 - 包含所有核心业务逻辑

pub mod models;
pub mod coercion;
pub mod evaluator;
pub mod id_gen;
pub mod rule_store;
pub mod content;
pub mod samples;
pub mod session;
