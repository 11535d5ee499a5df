use crate::database::{BroadcastFeed, Table};
use actix_web::web::Bytes;
use actix_web::{HttpResponse, Result, web};
use futures_util::Stream;
use std::convert::Infallible;
use tokio::sync::broadcast;

fn change_event(table: Table) -> Bytes {
    Bytes::from(format!("event: change\ndata: {table}\n\n"))
}

/// Server-sent events, one per changed table. A client that falls behind is told
/// every table changed so it re-fetches everything.
pub fn change_stream(
    rx: broadcast::Receiver<Table>,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(table) => Some((Ok(change_event(table)), rx)),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::debug!("Realtime client lagged {n} notifications");
                let all: String = Table::ALL
                    .iter()
                    .map(|t| format!("event: change\ndata: {t}\n\n"))
                    .collect();
                Some((Ok(Bytes::from(all)), rx))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    })
}

#[utoipa::path(
    get,
    path = "/realtime",
    tag = "realtime",
    responses(
        (status = 200, description = "text/event-stream of `change` events naming a table")
    )
)]
pub async fn subscribe(feed: web::Data<BroadcastFeed>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(change_stream(feed.receiver())))
}

pub fn realtime_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/realtime", web::get().to(subscribe));
}
