use std::{env, net::Ipv4Addr, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Holds everything required to initialize and run the provisioning server:
/// database connection details, HTTP bind parameters, CORS settings, logging
/// preferences, Stripe credentials for the billing webhook, and the VPN
/// gateway parameters handed out to desktop clients.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Shared token guarding the administrative revocation endpoint.
    /// Leaving it unset disables that endpoint entirely.
    pub admin_token: String,
    /// WireGuard gateway and connection descriptor settings.
    pub vpn: VpnConfig,
}

#[derive(Clone, Debug)]
/// Parameters of the WireGuard gateway this server provisions peers on,
/// plus the connection descriptor returned to validated desktop clients.
pub struct VpnConfig {
    /// Public hostname desktop clients connect to.
    pub server_host: String,
    /// UDP port of the WireGuard endpoint.
    pub server_port: u16,
    /// Tunnel protocol advertised to clients.
    pub protocol: String,
    /// Human-readable server location advertised to clients.
    pub location: String,
    /// The gateway's WireGuard public key. Generated during gateway setup.
    pub server_public_key: String,
    /// Base address of the /24 tunnel block clients are allocated from.
    pub subnet: Ipv4Addr,
    /// Name of the WireGuard interface on the gateway host.
    pub interface: String,
    /// Path to the `wg` control utility.
    pub wg_binary: String,
    /// Upper bound, in seconds, on any single `wg` invocation.
    pub gateway_timeout_secs: u64,
}

impl VpnConfig {
    /// Reads the VPN gateway configuration from environment variables.
    ///
    /// All values have defaults except `WG_SERVER_PUBLIC_KEY`; an empty
    /// server public key is tolerated here so the web side can run without
    /// a gateway, and warned about at startup.
    ///
    /// # Panics
    ///
    /// Panics if `VPN_SUBNET` or `VPN_SERVER_PORT` is set but unparseable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        VpnConfig {
            server_host: env::var("VPN_SERVER_HOST")
                .unwrap_or_else(|_| "vpn.cloaknet.dk".to_string()),
            server_port: env::var("VPN_SERVER_PORT")
                .unwrap_or_else(|_| "51820".to_string())
                .parse()
                .expect("VPN_SERVER_PORT must be a valid port number"),
            protocol: env::var("VPN_PROTOCOL").unwrap_or_else(|_| "wireguard".to_string()),
            location: env::var("VPN_LOCATION").unwrap_or_else(|_| "Germany".to_string()),
            server_public_key: env::var("WG_SERVER_PUBLIC_KEY").unwrap_or_default(),
            subnet: env::var("VPN_SUBNET")
                .unwrap_or_else(|_| "10.0.0.0".to_string())
                .parse()
                .expect("VPN_SUBNET must be a valid IPv4 address"),
            interface: env::var("WG_INTERFACE").unwrap_or_else(|_| "wg0".to_string()),
            wg_binary: env::var("WG_BINARY").unwrap_or_else(|_| "wg".to_string()),
            gateway_timeout_secs: env::var("WG_COMMAND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("WG_COMMAND_TIMEOUT_SECS must be a valid number"),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: "development" or "production"
    /// - `DATABASE_URL`: Connection string for the database
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `STRIPE_SECRET_KEY` / `STRIPE_WEBHOOK_SECRET`: Billing webhook credentials
    /// - `ADMIN_TOKEN`: Token for the administrative revocation endpoint
    /// - VPN gateway settings (see `VpnConfig::from_env`)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing
    /// or if numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_default(),
            vpn: VpnConfig::from_env(),
        })
    }
}
