use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::access::verify,
        handlers::access::request_access,
        handlers::access::get_session,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::list_categories,
        handlers::booking::checkout,
        handlers::booking::my_bookings,
        handlers::booking::get_booking,
        handlers::coupon::validate_coupon,
        handlers::chat::get_conversation,
        handlers::chat::send_message,
        handlers::content::get_content,
        handlers::realtime::subscribe,
        handlers::admin::list_codes,
        handlers::admin::issue_code,
        handlers::admin::approve_code,
        handlers::admin::block_code,
        handlers::admin::reactivate_code,
        handlers::admin::delete_code,
        handlers::admin::list_bookings,
        handlers::admin::update_booking_status,
        handlers::admin::upsert_product,
        handlers::admin::delete_product,
        handlers::admin::upsert_category,
        handlers::admin::delete_category,
        handlers::admin::list_coupons,
        handlers::admin::create_coupon,
        handlers::admin::set_coupon_active,
        handlers::admin::delete_coupon,
        handlers::admin::unread_count,
        handlers::admin::get_conversation,
        handlers::admin::reply,
        handlers::admin::mark_read,
        handlers::admin::get_content,
        handlers::admin::update_content,
        handlers::admin::report_summary,
        handlers::admin::outbox_pending,
        handlers::admin::drain_outbox,
    ),
    components(
        schemas(
            CodeStatus,
            CustomerCode,
            VerifyCodeRequest,
            RequestAccessRequest,
            RequestAccessResponse,
            IssueCodeRequest,
            Role,
            Session,
            SessionResponse,
            Product,
            Specifications,
            Category,
            Section,
            UpsertProductRequest,
            UpsertCategoryRequest,
            BookingStatus,
            BookingItem,
            Booking,
            CartLine,
            CheckoutRequest,
            UpdateBookingStatusRequest,
            DiscountType,
            Coupon,
            CreateCouponRequest,
            SetCouponActiveRequest,
            ValidateCouponRequest,
            ValidateCouponResponse,
            Sender,
            ChatMessage,
            SendMessageRequest,
            UnreadCountResponse,
            AppContent,
            UpdateContentRequest,
            ReportSummary,
            DrainReport,
            ApiError,
            ApiErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "access", description = "Access code verification and requests"),
        (name = "catalog", description = "Products and categories"),
        (name = "booking", description = "Checkout and customer bookings"),
        (name = "coupon", description = "Coupon validation"),
        (name = "chat", description = "Customer support chat"),
        (name = "content", description = "Storefront texts"),
        (name = "realtime", description = "Table change notifications"),
        (name = "admin", description = "Admin dashboard API"),
    ),
    info(
        title = "Nice Events Backend API",
        version = "1.0.0",
        description = "Event-rental storefront REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
