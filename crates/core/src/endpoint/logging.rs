use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use alloy::{
    rpc::json_rpc::{RequestPacket, ResponsePacket},
    transports::TransportError,
};
use tower::{Layer, Service};
use tracing::debug;

/// A layer to be used with `ClientBuilder::layer` that logs the method and latency of every request.
#[derive(Clone, Debug, Default)]
pub struct RpcLoggingLayer;

impl RpcLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RpcLoggingLayer {
    type Service = RpcLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RpcLoggingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RpcLoggingService<S> {
    inner: S,
}

impl<S> Service<RequestPacket> for RpcLoggingService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>,
    S::Future: Send + 'static,
    S::Response: Send + 'static + Debug,
    S::Error: Send + 'static + Debug,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let method = match &req {
            RequestPacket::Single(inner_req) => inner_req.method().to_owned(),
            RequestPacket::Batch(reqs) => format!("batch({})", reqs.len()),
        };

        let start_time = tokio::time::Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let res = fut.await;
            let elapsed = start_time.elapsed().as_millis() as u64;
            match &res {
                Ok(_) => debug!("{method} ok in {elapsed}ms"),
                Err(e) => debug!("{method} failed in {elapsed}ms: {e:?}"),
            }
            res
        })
    }
}
