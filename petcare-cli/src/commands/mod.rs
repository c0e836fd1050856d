pub mod models;
pub mod serve;
