pub mod config;
pub mod db;
pub mod model;
pub mod spapi;
pub mod state;
