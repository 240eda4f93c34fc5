pub mod errors;
pub mod route_debug;
pub mod types;
