use crate::handlers::access::current_customer;
use crate::middlewares::current_claims;
use crate::models::*;
use crate::services::{AccessService, BookingService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "booking",
    request_body = CheckoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Booking created", body = Booking),
        (status = 400, description = "Invalid cart or coupon"),
        (status = 401, description = "Code no longer active")
    )
)]
pub async fn checkout(
    access_service: web::Data<AccessService>,
    booking_service: web::Data<BookingService>,
    req: HttpRequest,
    request: web::Json<CheckoutRequest>,
) -> Result<HttpResponse> {
    let customer = match current_customer(&req, &access_service).await {
        Ok(customer) => customer,
        Err(e) => return Ok(e.error_response()),
    };

    match booking_service.checkout(&customer, request.into_inner()).await {
        Ok(booking) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": booking
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "booking",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The caller's bookings, newest first", body = [Booking])
    )
)]
pub async fn my_bookings(
    access_service: web::Data<AccessService>,
    booking_service: web::Data<BookingService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let customer = match current_customer(&req, &access_service).await {
        Ok(customer) => customer,
        Err(e) => return Ok(e.error_response()),
    };

    match booking_service.my_bookings(&customer.id).await {
        Ok(bookings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": bookings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "booking",
    params(
        ("id" = String, Path, description = "Booking id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "No such booking for this caller")
    )
)]
pub async fn get_booking(
    access_service: web::Data<AccessService>,
    booking_service: web::Data<BookingService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let session = match current_claims(&req) {
        Ok(claims) if claims.is_admin() => Session::admin(),
        Ok(_) => match current_customer(&req, &access_service).await {
            Ok(customer) => Session::customer(customer),
            Err(e) => return Ok(e.error_response()),
        },
        Err(e) => return Ok(e.error_response()),
    };

    match booking_service.get(&session, &path).await {
        Ok(booking) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": booking
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn booking_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(checkout))
            .route("", web::get().to(my_bookings))
            .route("/{id}", web::get().to(get_booking)),
    );
}
