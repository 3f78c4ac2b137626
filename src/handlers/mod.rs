// src/handlers/mod.rs

pub mod admin;
pub mod assets;
pub mod learner;
