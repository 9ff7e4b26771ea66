//! API handlers

pub mod cv;
pub mod health;
