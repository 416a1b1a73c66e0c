use actix_web::web;

pub mod routes {
    pub mod vpn;
}

mod dtos {
    pub(crate) mod vpn;
}

/// Public endpoints consumed by the desktop tunnel client.
pub fn mount_vpn() -> actix_web::Scope {
    web::scope("/vpn")
        .service(routes::vpn::post_validate)
        .service(routes::vpn::post_register)
}

/// Token-guarded administrative endpoints.
pub fn mount_admin() -> actix_web::Scope {
    web::scope("/admin")
        .service(routes::vpn::post_revoke)
        .service(routes::vpn::get_key)
}
