pub mod model;
pub mod queries;
