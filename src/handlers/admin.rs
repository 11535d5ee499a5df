//! Admin dashboard endpoints. The auth middleware only lets admin sessions into
//! `/api/v1/admin`.

use crate::database::DynStore;
use crate::models::*;
use crate::services::*;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn ok<T: serde::Serialize>(data: T) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": data
    })))
}

// ---- access codes ----

#[utoipa::path(
    get,
    path = "/admin/codes",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("perPage" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "pending / approved / rejected / blocked")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Access codes, newest first"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_codes(
    access_service: web::Data<AccessService>,
    query: web::Query<CodeQuery>,
) -> Result<HttpResponse> {
    match access_service.list_codes(&query).await {
        Ok(page) => ok(page),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/codes",
    tag = "admin",
    request_body = IssueCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Approved code issued", body = CustomerCode)
    )
)]
pub async fn issue_code(
    access_service: web::Data<AccessService>,
    request: web::Json<IssueCodeRequest>,
) -> Result<HttpResponse> {
    match access_service.issue(request.into_inner()).await {
        Ok(code) => ok(code),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/codes/{id}/approve",
    tag = "admin",
    params(("id" = String, Path, description = "Access code record id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Approved with a fresh code", body = CustomerCode),
        (status = 404, description = "No such record")
    )
)]
pub async fn approve_code(
    access_service: web::Data<AccessService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match access_service.approve(&path).await {
        Ok(code) => ok(code),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/codes/{id}/block",
    tag = "admin",
    params(("id" = String, Path, description = "Access code record id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Blocked", body = CustomerCode),
        (status = 409, description = "Only approved codes can be blocked")
    )
)]
pub async fn block_code(
    access_service: web::Data<AccessService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match access_service.block(&path).await {
        Ok(code) => ok(code),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/codes/{id}/reactivate",
    tag = "admin",
    params(("id" = String, Path, description = "Access code record id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Approved again with a fresh code", body = CustomerCode),
        (status = 409, description = "Only blocked codes can be reactivated")
    )
)]
pub async fn reactivate_code(
    access_service: web::Data<AccessService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match access_service.reactivate(&path).await {
        Ok(code) => ok(code),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/codes/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Access code record id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted (rejects a pending request)"),
        (status = 404, description = "No such record")
    )
)]
pub async fn delete_code(
    access_service: web::Data<AccessService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match access_service.delete(&id).await {
        Ok(()) => ok(json!({ "id": id })),
        Err(e) => Ok(e.error_response()),
    }
}

// ---- bookings ----

#[utoipa::path(
    get,
    path = "/admin/bookings",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("perPage" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "Pending / Confirmed / Delivered / Completed / Cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Bookings, newest first")
    )
)]
pub async fn list_bookings(
    booking_service: web::Data<BookingService>,
    query: web::Query<BookingQuery>,
) -> Result<HttpResponse> {
    match booking_service.list(&query).await {
        Ok(page) => ok(page),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/bookings/{id}/status",
    tag = "admin",
    params(("id" = String, Path, description = "Booking id")),
    request_body = UpdateBookingStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Status changed", body = Booking),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_booking_status(
    booking_service: web::Data<BookingService>,
    path: web::Path<String>,
    request: web::Json<UpdateBookingStatusRequest>,
) -> Result<HttpResponse> {
    match booking_service.set_status(&path, request.status).await {
        Ok(booking) => ok(booking),
        Err(e) => Ok(e.error_response()),
    }
}

// ---- catalog ----

#[utoipa::path(
    put,
    path = "/admin/products",
    tag = "admin",
    request_body = UpsertProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product saved", body = Product)
    )
)]
pub async fn upsert_product(
    catalog_service: web::Data<CatalogService>,
    request: web::Json<UpsertProductRequest>,
) -> Result<HttpResponse> {
    match catalog_service.upsert_product(request.into_inner()).await {
        Ok(product) => ok(product),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Product id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product deleted")
    )
)]
pub async fn delete_product(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match catalog_service.delete_product(&id).await {
        Ok(()) => ok(json!({ "id": id })),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/categories",
    tag = "admin",
    request_body = UpsertCategoryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Category saved", body = Category)
    )
)]
pub async fn upsert_category(
    catalog_service: web::Data<CatalogService>,
    request: web::Json<UpsertCategoryRequest>,
) -> Result<HttpResponse> {
    match catalog_service.upsert_category(request.into_inner()).await {
        Ok(category) => ok(category),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Category id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Category deleted")
    )
)]
pub async fn delete_category(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match catalog_service.delete_category(&id).await {
        Ok(()) => ok(json!({ "id": id })),
        Err(e) => Ok(e.error_response()),
    }
}

// ---- coupons ----

#[utoipa::path(
    get,
    path = "/admin/coupons",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All coupons", body = [Coupon])
    )
)]
pub async fn list_coupons(coupon_service: web::Data<CouponService>) -> Result<HttpResponse> {
    match coupon_service.list().await {
        Ok(coupons) => ok(coupons),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/coupons",
    tag = "admin",
    request_body = CreateCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon created", body = Coupon),
        (status = 400, description = "Invalid or duplicate coupon")
    )
)]
pub async fn create_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.create(request.into_inner()).await {
        Ok(coupon) => ok(coupon),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/coupons/{id}/active",
    tag = "admin",
    params(("id" = String, Path, description = "Coupon id")),
    request_body = SetCouponActiveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon updated", body = Coupon)
    )
)]
pub async fn set_coupon_active(
    coupon_service: web::Data<CouponService>,
    path: web::Path<String>,
    request: web::Json<SetCouponActiveRequest>,
) -> Result<HttpResponse> {
    match coupon_service.set_active(&path, request.is_active).await {
        Ok(coupon) => ok(coupon),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/coupons/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Coupon id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon deleted")
    )
)]
pub async fn delete_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match coupon_service.delete(&id).await {
        Ok(()) => ok(json!({ "id": id })),
        Err(e) => Ok(e.error_response()),
    }
}

// ---- chat ----

#[utoipa::path(
    get,
    path = "/admin/chat/unread",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Unread customer messages", body = UnreadCountResponse)
    )
)]
pub async fn unread_count(chat_service: web::Data<ChatService>) -> Result<HttpResponse> {
    match chat_service.admin_unread_count().await {
        Ok(unread) => ok(UnreadCountResponse { unread }),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/chat/{user_id}",
    operation_id = "admin_get_conversation",
    tag = "admin",
    params(("user_id" = String, Path, description = "Customer code id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Conversation, oldest first", body = [ChatMessage])
    )
)]
pub async fn get_conversation(
    chat_service: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match chat_service.conversation(&path).await {
        Ok(messages) => ok(messages),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/chat/{user_id}",
    tag = "admin",
    params(("user_id" = String, Path, description = "Customer code id")),
    request_body = SendMessageRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reply sent", body = ChatMessage)
    )
)]
pub async fn reply(
    chat_service: web::Data<ChatService>,
    path: web::Path<String>,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    match chat_service.send(&path, Sender::Admin, &request.text).await {
        Ok(message) => ok(message),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/chat/{user_id}/read",
    tag = "admin",
    params(("user_id" = String, Path, description = "Customer code id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Customer messages marked read")
    )
)]
pub async fn mark_read(
    chat_service: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match chat_service.mark_read(&path, Sender::Admin).await {
        Ok(marked) => ok(json!({ "marked": marked })),
        Err(e) => Ok(e.error_response()),
    }
}

// ---- content, reports, outbox ----

#[utoipa::path(
    get,
    path = "/admin/content",
    operation_id = "admin_get_content",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Full settings including the master password", body = AppContent)
    )
)]
pub async fn get_content(content_service: web::Data<ContentService>) -> Result<HttpResponse> {
    match content_service.get().await {
        Ok(content) => ok(content),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/content",
    tag = "admin",
    request_body = UpdateContentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Settings saved", body = AppContent)
    )
)]
pub async fn update_content(
    content_service: web::Data<ContentService>,
    request: web::Json<UpdateContentRequest>,
) -> Result<HttpResponse> {
    match content_service.update(request.into_inner()).await {
        Ok(content) => ok(content),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/reports/summary",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Revenue and counters", body = ReportSummary)
    )
)]
pub async fn report_summary(report_service: web::Data<ReportService>) -> Result<HttpResponse> {
    match report_service.summary().await {
        Ok(summary) => ok(summary),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/outbox",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Records waiting for the store")
    )
)]
pub async fn outbox_pending(outbox: web::Data<OutboxService>) -> Result<HttpResponse> {
    ok(outbox.pending().await)
}

#[utoipa::path(
    post,
    path = "/admin/outbox/drain",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Replay result", body = DrainReport)
    )
)]
pub async fn drain_outbox(
    outbox: web::Data<OutboxService>,
    store: web::Data<DynStore>,
) -> Result<HttpResponse> {
    match outbox.drain(store.get_ref().as_ref()).await {
        Ok(report) => ok(report),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/codes", web::get().to(list_codes))
            .route("/codes", web::post().to(issue_code))
            .route("/codes/{id}/approve", web::post().to(approve_code))
            .route("/codes/{id}/block", web::post().to(block_code))
            .route("/codes/{id}/reactivate", web::post().to(reactivate_code))
            .route("/codes/{id}", web::delete().to(delete_code))
            .route("/bookings", web::get().to(list_bookings))
            .route("/bookings/{id}/status", web::put().to(update_booking_status))
            .route("/products", web::put().to(upsert_product))
            .route("/products/{id}", web::delete().to(delete_product))
            .route("/categories", web::put().to(upsert_category))
            .route("/categories/{id}", web::delete().to(delete_category))
            .route("/coupons", web::get().to(list_coupons))
            .route("/coupons", web::post().to(create_coupon))
            .route("/coupons/{id}/active", web::put().to(set_coupon_active))
            .route("/coupons/{id}", web::delete().to(delete_coupon))
            .route("/chat/unread", web::get().to(unread_count))
            .route("/chat/{user_id}", web::get().to(get_conversation))
            .route("/chat/{user_id}", web::post().to(reply))
            .route("/chat/{user_id}/read", web::post().to(mark_read))
            .route("/content", web::get().to(get_content))
            .route("/content", web::put().to(update_content))
            .route("/reports/summary", web::get().to(report_summary))
            .route("/outbox", web::get().to(outbox_pending))
            .route("/outbox/drain", web::post().to(drain_outbox)),
    );
}
