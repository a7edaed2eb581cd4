// src/models/mod.rs

pub mod attempt;
pub mod common;
pub mod delivery;
pub mod exam;
pub mod group;
pub mod participant;
pub mod progress;
pub mod question;
pub mod user;
