pub mod controller;
pub mod file;
