// src/models/mod.rs

pub mod attempt;
pub mod catalog;
pub mod question;
pub mod result;
pub mod user;
