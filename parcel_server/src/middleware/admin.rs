//! Admin guard middleware for the parcel server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's numeric id from the `parcel_admin_id` header and checks it against the [`AdminAllowlist`]
//! registered as app data. Requests from anyone not on the list are answered with an error response and never reach
//! the handler.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    config::AdminAllowlist,
    errors::{AuthError, ServerError},
};

pub const ADMIN_ID_HEADER: &str = "parcel_admin_id";

#[derive(Default)]
pub struct AdminMiddlewareFactory;

impl AdminMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdminMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            match check_admin(&req) {
                Ok(admin_id) => {
                    trace!("💻️ Admin {admin_id} authorised for {}", req.path());
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                },
                Err(e) => {
                    debug!("💻️ Admin access denied for {}. {e}", req.path());
                    Ok(req.error_response(ServerError::AuthenticationError(e)).map_into_right_body())
                },
            }
        })
    }
}

fn check_admin(req: &ServiceRequest) -> Result<i64, AuthError> {
    let value = req.headers().get(ADMIN_ID_HEADER).ok_or(AuthError::MissingAdminId)?;
    let raw = value.to_str().map_err(|_| AuthError::InvalidAdminId("<binary>".into()))?;
    let admin_id = raw.trim().parse::<i64>().map_err(|_| AuthError::InvalidAdminId(raw.to_string()))?;
    let allowed = req.app_data::<web::Data<AdminAllowlist>>().map(|list| list.contains(admin_id)).unwrap_or_else(|| {
        warn!("💻️ No admin allowlist is registered. Denying all admin requests.");
        false
    });
    if allowed {
        Ok(admin_id)
    } else {
        Err(AuthError::NotAnAdmin(admin_id))
    }
}
