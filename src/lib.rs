pub mod config;
pub mod controllers;
pub mod dtos;
pub mod effects;
pub mod error;
pub mod gateway;
pub mod models;
pub mod render;
pub mod validation;

#[cfg(test)]
mod tests;
