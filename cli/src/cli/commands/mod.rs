pub mod start;
pub mod status;
pub mod routes;
