use middleware::ip::IpRateLimiter;

pub mod middleware {
    pub mod ip;
}

/// Per-caller-address rate limiting. The validation endpoint is public and
/// hit on every connection attempt, so limits are keyed by IP rather than
/// applied globally.
pub fn ip_middleware(permits_per_minute: u32) -> IpRateLimiter {
    IpRateLimiter::new(permits_per_minute)
}
