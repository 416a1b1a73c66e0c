pub mod env_config;
pub mod error;
pub mod http;
pub mod ipalloc;
pub mod key;
pub mod stripe;
