// src/models/mod.rs

pub mod exam;
pub mod exam_attempt;
pub mod reference;
