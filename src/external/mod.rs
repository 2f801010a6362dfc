pub mod google_maps;
pub mod http;
pub mod rate_limiter;
pub mod retry;
pub mod wikipedia;
