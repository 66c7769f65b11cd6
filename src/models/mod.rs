// src/models/mod.rs

pub mod quiz;
pub mod result;
pub mod school;
pub mod user;
