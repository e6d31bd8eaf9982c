use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};

use crate::domain::principal::Principal;
use crate::errors::AppError;
use crate::AppState;

/// Caller of an endpoint that also serves anonymous users.
///
/// A missing `Authorization` header yields `None`; a header that is present
/// but invalid is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybePrincipal(pub Option<Principal>);

fn authorization(req: &HttpRequest) -> Result<Option<&str>, AppError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::Unauthorized("malformed Authorization header".to_string()))
        })
        .transpose()
}

fn resolve(req: &HttpRequest, header: Option<&str>) -> Result<Principal, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
    Ok(state.principals.resolve(header)?)
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorization(req).and_then(|h| resolve(req, h)))
    }
}

impl FromRequest for MaybePrincipal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorization(req).and_then(|h| match h {
            None => Ok(MaybePrincipal(None)),
            Some(h) => resolve(req, Some(h)).map(|p| MaybePrincipal(Some(p))),
        }))
    }
}
