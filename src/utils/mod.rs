// src/utils/mod.rs

pub mod cache;
pub mod gate;
pub mod html;
pub mod session;
