pub mod commands;
pub mod context;
pub mod model;
pub mod refresher;
