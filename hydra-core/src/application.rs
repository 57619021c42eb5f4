// HTTP server loop

use crate::{Error, HttpRequest, HttpResponse, Router};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::Instrument;

/// An HTTP/1.1 server dispatching every request through a [`Router`].
pub struct Application {
    router: Arc<Router>,
}

impl Application {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Bind `addr` and serve until Ctrl-C.
    pub async fn listen(self, addr: &str) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serve connections from `listener` until `shutdown` resolves. In-flight
    /// connections finish on their own tasks.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let local: SocketAddr = listener.local_addr()?;
        tracing::info!(addr = %local, "server listening");

        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    tracing::info!(addr = %local, "server shutting down");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let router = router.clone();
                    async move { handle_request(req, router).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(peer = %peer, error = %err, "connection closed with error");
                }
            });
        }
    }
}

/// Run one request through the router and convert the outcome to a hyper
/// response. Router errors become JSON error bodies.
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();
    let is_head = req.method() == hyper::Method::HEAD;

    let mut hydra_req = HttpRequest::new(method.clone(), &target);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            hydra_req
                .headers
                .insert(name.as_str().to_lowercase(), value.to_string());
        }
    }
    hydra_req.body = req.collect().await?.to_bytes().to_vec();

    let span = tracing::info_span!("request", method = %method, path = %hydra_req.path);
    let started = Instant::now();

    let response = async {
        match router.route(hydra_req).await {
            Ok(resp) => resp,
            Err(err) => {
                if err.is_client_error() {
                    tracing::debug!(error = %err, "request rejected");
                } else {
                    tracing::error!(error = %err, "request failed");
                }
                HttpResponse::from_error(&err)
            }
        }
    }
    .instrument(span.clone())
    .await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    Ok(into_hyper(response, is_head))
}

fn into_hyper(response: HttpResponse, is_head: bool) -> Response<Full<bytes::Bytes>> {
    let status = response.status;
    let mut builder = Response::builder().status(status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = if is_head {
        Full::new(bytes::Bytes::new())
    } else {
        Full::new(bytes::Bytes::from(response.body))
    };

    builder.body(body).unwrap_or_else(|err| {
        tracing::error!(error = %err, status, "invalid response head");
        let mut fallback = Response::new(Full::new(bytes::Bytes::from_static(
            b"{\"error\":\"invalid response\",\"status\":500}",
        )));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
