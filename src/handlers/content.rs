use crate::services::ContentService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/content",
    tag = "content",
    responses(
        (status = 200, description = "Storefront texts and settings", body = AppContent)
    )
)]
pub async fn get_content(content_service: web::Data<ContentService>) -> Result<HttpResponse> {
    match content_service.get_public().await {
        Ok(content) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": content
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn content_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/content", web::get().to(get_content));
}
