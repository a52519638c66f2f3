//! Version endpoint
//!
//! Reports the API version the process was started with.

use std::{
    fmt,
    future::{ready, Ready},
    sync::Arc,
};

use actix_web::{
    body::BoxBody, dev::Payload, get, http::StatusCode, web, FromRequest,
    HttpRequest, HttpResponse, Responder,
};

use crate::{
    configuration::{ApiVersion, AppState, State},
    error::Error,
    model::Version,
};

/// Request binding for the version operation. The operation takes no
/// parameters, so binding never fails; the raw request is kept alongside.
#[derive(Debug, Clone)]
pub struct VersionParams {
    pub http_request: HttpRequest,
}

impl FromRequest for VersionParams {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(VersionParams {
            http_request: req.clone(),
        }))
    }
}

/// Documented responses of the version operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionResponder {
    Ok(Version),
}

impl VersionResponder {
    pub fn status(&self) -> StatusCode {
        match self {
            VersionResponder::Ok(_) => StatusCode::OK,
        }
    }
}

impl Responder for VersionResponder {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        let status = self.status();
        match self {
            VersionResponder::Ok(payload) => {
                HttpResponse::build(status).json(payload)
            },
        }
    }
}

pub trait VersionHandler: fmt::Debug + Send + Sync {
    fn handle(&self, params: VersionParams) -> VersionResponder;
}

#[derive(Debug)]
struct VersionImpl {
    api_version: ApiVersion,
}

pub fn new_version_handler(api_version: ApiVersion) -> Arc<dyn VersionHandler> {
    Arc::new(VersionImpl { api_version })
}

impl VersionHandler for VersionImpl {
    fn handle(&self, _params: VersionParams) -> VersionResponder {
        VersionResponder::Ok(Version {
            api_version: self.api_version.to_string(),
        })
    }
}

#[get("/version")]
pub async fn index(
    state: web::Data<AppState<State>>,
    params: VersionParams,
) -> Result<impl Responder, Error> {
    Ok(state.version_handler.handle(params))
}
