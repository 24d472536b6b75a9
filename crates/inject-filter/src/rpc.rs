use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use inject_proto::inject::inject_service_client::InjectServiceClient;
use inject_proto::inject::{InjectRequest, InjectResponse};
use tonic::transport::Channel;

use crate::error::RpcError;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Dispatches one `InjectService.InjectHeaders` call and returns a future
/// resolving to the reply. The state machine polls the returned future
/// exactly once right after calling `send`: a `Poll::Ready` there means the
/// implementation completed synchronously, `Poll::Pending` means it must be
/// driven to completion later.
pub trait InjectClient: Send + Sync {
	fn send(&self, request: InjectRequest, timeout: Duration) -> BoxFuture<Result<InjectResponse, RpcError>>;
}

/// An [`InjectClient`] backed by a real gRPC channel to the configured
/// cluster.
#[derive(Clone)]
pub struct GrpcInjectClient {
	client: InjectServiceClient<Channel>,
}

impl GrpcInjectClient {
	pub fn new(channel: Channel) -> Self {
		Self { client: InjectServiceClient::new(channel) }
	}
}

impl InjectClient for GrpcInjectClient {
	fn send(&self, request: InjectRequest, timeout: Duration) -> BoxFuture<Result<InjectResponse, RpcError>> {
		let mut client = self.client.clone();
		Box::pin(async move {
			let mut req = tonic::Request::new(request);
			req.set_timeout(timeout);
			let resp = tokio::time::timeout(timeout, client.inject_headers(req))
				.await
				.map_err(|_| RpcError::Timeout(timeout))??;
			Ok(resp.into_inner())
		})
	}
}
