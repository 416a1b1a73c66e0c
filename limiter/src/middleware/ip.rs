use std::{future::Future, net::IpAddr, num::NonZeroU32, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::error::AppError;
use governor::{
    Quota, RateLimiter,
    clock::QuantaClock,
    state::keyed::DashMapStateStore,
};

type IpStateStore = DashMapStateStore<IpAddr>;

/// Limits each caller address independently.
pub struct IpRateLimiter {
    limiter: Arc<RateLimiter<IpAddr, IpStateStore, QuantaClock>>,
}

impl IpRateLimiter {
    pub fn new(permits_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(permits_per_minute).unwrap());
        let limiter = Arc::new(RateLimiter::keyed(quota));
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IpRateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = IpRateLimiterService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(IpRateLimiterService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct IpRateLimiterService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter<IpAddr, IpStateStore, QuantaClock>>,
}

impl<S, B> Service<ServiceRequest> for IpRateLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let limiter = self.limiter.clone();

        let peer: Option<IpAddr> = req
            .connection_info()
            .realip_remote_addr()
            .and_then(|addr| addr.parse().ok());

        Box::pin(async move {
            let allowed = match peer {
                Some(ip) => limiter.check_key(&ip).is_ok(),
                // No parseable caller address (e.g. unix socket tests):
                // let the request through rather than lock everyone out.
                None => true,
            };

            if allowed {
                srv.call(req).await.map(|res| res.map_into_boxed_body())
            } else {
                Ok(req.error_response(AppError::TooManyRequests(
                    "Too many requests from this address. Please slow down.".to_string(),
                )))
            }
        })
    }
}
