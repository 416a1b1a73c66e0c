use actix_web::web;

pub mod routes {
    pub mod pay;
}

mod services {
    pub(crate) mod pay;
}

pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}
