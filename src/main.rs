use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use nice_events_backend::{
    config::Config,
    database::{BroadcastFeed, DynStore, ObservedStore, create_store},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to load configuration")?;

    // 存储后端 + 变更通知
    let feed = Arc::new(BroadcastFeed::new());
    let backend = create_store(&config.store).context("Failed to create store")?;
    let store: DynStore = Arc::new(ObservedStore::new(backend, feed.clone()));

    let outbox = Arc::new(
        OutboxService::load(&config.outbox.path)
            .await
            .with_context(|| format!("Failed to open outbox at {}", config.outbox.path))?,
    );

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.expires_in);

    // 创建服务
    let content_service = ContentService::new(store.clone());
    let access_service = AccessService::new(
        store.clone(),
        outbox.clone(),
        content_service.clone(),
        config.auth.clone(),
    );
    let catalog_service = CatalogService::new(store.clone());
    let coupon_service = CouponService::new(store.clone());
    let booking_service = BookingService::new(
        store.clone(),
        outbox.clone(),
        catalog_service.clone(),
        coupon_service.clone(),
    );
    let chat_service = ChatService::new(store.clone(), outbox.clone());
    let report_service = ReportService::new(store.clone());

    catalog_service.reload().await;
    catalog_service.attach(feed.as_ref());

    tasks::spawn_all(
        outbox.clone(),
        store.clone(),
        catalog_service.clone(),
        config.outbox.drain_interval_secs,
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let feed_data = web::Data::from(feed);
    let outbox_data = web::Data::from(outbox);

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(feed_data.clone())
            .app_data(outbox_data.clone())
            .app_data(web::Data::new(access_service.clone()))
            .app_data(web::Data::new(content_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(booking_service.clone()))
            .app_data(web::Data::new(chat_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .configure(swagger_config)
            .configure(handlers::api_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
