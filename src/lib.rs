pub mod config;
pub mod middleware;
pub mod routes {
    pub mod health;
    pub mod metrics;
    pub mod scan;
}
pub mod services {
    pub mod candle_input;
    pub mod scanner;
}

pub mod utils;
