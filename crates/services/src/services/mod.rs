pub mod config;
pub mod creation;
pub mod gallery;
pub mod identity;
pub mod pdf;
pub mod upload;
