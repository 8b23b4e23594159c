//! Meal-plan intake — collects a user's profile, body metrics and
//! allergies across wizard steps and submits them in one request.

pub mod config;
pub mod error;
pub mod intake;
