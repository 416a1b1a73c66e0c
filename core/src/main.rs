mod cors;

use std::time::Duration;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.environment == "production";
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    if config.vpn.server_public_key.is_empty() {
        log::warn!("WG_SERVER_PUBLIC_KEY is not set; clients cannot build a tunnel config");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    // gateway control handle; validates the interface name up front
    let wg = gateway::WgCli::new(
        &config.vpn.wg_binary,
        &config.vpn.interface,
        Duration::from_secs(config.vpn.gateway_timeout_secs),
    )
    .expect("Invalid WireGuard gateway configuration");
    let wg = web::Data::new(wg);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(wg.clone())
            .wrap(limiter::ip_middleware(60)) // max 60 requests per minute per address
            .wrap(logger::middleware())
            .wrap(cors::middleware(&origin))
            .service(
                web::scope("/api")
                    .service(api_subs::mount_webhook())
                    .service(api_vpn::mount_vpn())
                    .service(api_vpn::mount_admin()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
