use crate::database::DynStore;
use crate::error::{AppError, AppResult};
use crate::middlewares::current_claims;
use crate::models::*;
use crate::services::{AccessService, OutboxService};
use crate::utils::JwtService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// Resolve the caller to a customer whose code is still active.
pub(crate) async fn current_customer(
    req: &HttpRequest,
    access_service: &AccessService,
) -> AppResult<CustomerCode> {
    let claims = current_claims(req)?;
    if claims.is_admin() {
        return Err(AppError::Forbidden);
    }
    access_service.active_customer(&claims.sub).await
}

#[utoipa::path(
    post,
    path = "/access/verify",
    tag = "access",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code accepted", body = SessionResponse),
        (status = 401, description = "Invalid or inactive code"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn verify(
    access_service: web::Data<AccessService>,
    jwt_service: web::Data<JwtService>,
    outbox: web::Data<OutboxService>,
    store: web::Data<DynStore>,
    request: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    let session = match access_service.verify_code(&request.code).await {
        Ok(session) => session,
        Err(e) => return Ok(e.error_response()),
    };

    // 后端可达，顺便补发离线期间积压的记录
    let outbox = outbox.into_inner();
    let store = store.get_ref().clone();
    tokio::spawn(async move {
        if let Err(e) = outbox.drain(store.as_ref()).await {
            log::warn!("Outbox drain after verify failed: {e}");
        }
    });

    match jwt_service.generate_token(&session) {
        Ok(access_token) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SessionResponse {
                session,
                access_token,
                expires_in: jwt_service.get_expires_in(),
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/access/request",
    tag = "access",
    request_body = RequestAccessRequest,
    responses(
        (status = 200, description = "Request recorded", body = RequestAccessResponse),
        (status = 400, description = "Invalid name or phone")
    )
)]
pub async fn request_access(
    access_service: web::Data<AccessService>,
    request: web::Json<RequestAccessRequest>,
) -> Result<HttpResponse> {
    match access_service
        .request_access(&request.name, request.phone.as_deref())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/access/session",
    tag = "access",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current session", body = Session),
        (status = 401, description = "Session expired or code deactivated")
    )
)]
pub async fn get_session(
    access_service: web::Data<AccessService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let session = match current_claims(&req) {
        Ok(claims) if claims.is_admin() => Ok(Session::admin()),
        Ok(claims) => access_service
            .active_customer(&claims.sub)
            .await
            .map(Session::customer),
        Err(e) => Err(e),
    };

    match session {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn access_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/access")
            .route("/verify", web::post().to(verify))
            .route("/request", web::post().to(request_access))
            .route("/session", web::get().to(get_session)),
    );
}
