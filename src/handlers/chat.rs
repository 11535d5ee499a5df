use crate::handlers::access::current_customer;
use crate::models::*;
use crate::services::{AccessService, ChatService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/chat",
    tag = "chat",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The caller's conversation, oldest first", body = [ChatMessage])
    )
)]
pub async fn get_conversation(
    access_service: web::Data<AccessService>,
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let customer = match current_customer(&req, &access_service).await {
        Ok(customer) => customer,
        Err(e) => return Ok(e.error_response()),
    };

    // 打开会话即视为已读管理员回复
    if let Err(e) = chat_service.mark_read(&customer.id, Sender::Customer).await {
        log::warn!("Failed to mark chat read for {}: {e}", customer.id);
    }

    match chat_service.conversation(&customer.id).await {
        Ok(messages) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": messages
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = SendMessageRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Message sent", body = ChatMessage),
        (status = 400, description = "Empty message")
    )
)]
pub async fn send_message(
    access_service: web::Data<AccessService>,
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let customer = match current_customer(&req, &access_service).await {
        Ok(customer) => customer,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .send(&customer.id, Sender::Customer, &request.text)
        .await
    {
        Ok(message) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": message
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn chat_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .route("", web::get().to(get_conversation))
            .route("", web::post().to(send_message)),
    );
}
