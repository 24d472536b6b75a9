use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use inject_proto::inject::{Header as ProtoHeader, InjectRequest, InjectResponse};

use crate::action::{Action, ActionKind};
use crate::config::FilterConfig;
use crate::cookie;
use crate::header_matcher::{matches, matches_any};
use crate::rpc::{BoxFuture, InjectClient};

/// Per-stream lifecycle state. Transitions are monotone: once `Done`, no
/// further callback mutates headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	NotTriggered,
	SendingInjectRequest,
	InjectRequestSent,
	WaitingForUpstream,
	Aborting,
	Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
	Continue,
	StopIteration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
	Continue,
	StopIterationAndBuffer,
	StopIterationNoBuffer,
}

/// The surrounding pipeline's callback surface, as consumed by the filter.
/// `continue_decoding` resumes a paused stream; `send_local_response`
/// synthesizes a response without contacting upstream.
pub trait PipelineCallbacks {
	fn continue_decoding(&mut self);
	fn send_local_response(&mut self, status: u16, headers: Vec<(String, String)>, body: Option<Bytes>);
}

fn to_header_value(v: &str) -> Option<HeaderValue> {
	HeaderValue::from_str(v).ok()
}

fn to_header_name(k: &str) -> Option<HeaderName> {
	HeaderName::from_bytes(k.as_bytes()).ok()
}

/// Applies `response`'s header set against `headers`, either unconditionally
/// (`inject_any`) or restricted to `allow_list`, always remove-then-add.
fn apply_injections(
	headers: &mut HeaderMap,
	allow_list: &[String],
	inject_any: bool,
	add: &[ProtoHeader],
	remove: &[String],
) {
	if inject_any {
		for h in add {
			headers.remove(h.key.as_str());
			if let (Some(name), Some(value)) = (to_header_name(&h.key), to_header_value(&h.value)) {
				headers.insert(name, value);
			}
		}
		for name in remove {
			headers.remove(name.as_str());
		}
		return;
	}

	let add_by_name: HashMap<&str, &str> = add.iter().map(|h| (h.key.as_str(), h.value.as_str())).collect();
	let remove_set: HashSet<&str> = remove.iter().map(String::as_str).collect();

	for name in allow_list {
		if remove_set.contains(name.as_str()) {
			headers.remove(name.as_str());
		} else if let Some(value) = add_by_name.get(name.as_str()) {
			// An empty replacement value leaves the header untouched rather
			// than clearing it.
			if !value.is_empty() {
				headers.remove(name.as_str());
				if let (Some(hn), Some(hv)) = (to_header_name(name), to_header_value(value)) {
					headers.insert(hn, hv);
				}
			}
		}
	}
}

/// Per-request coordinator: evaluates triggers, dispatches the enrichment
/// RPC, and applies the resolved action's header mutations in each
/// direction.
pub struct FilterStream {
	config: Arc<FilterConfig>,
	client: Arc<dyn InjectClient>,
	state: State,
	pending: Option<BoxFuture<Result<InjectResponse, crate::error::RpcError>>>,
	response: Option<InjectResponse>,
	action: Option<Arc<Action>>,
	buffered_data: Vec<Bytes>,
}

impl FilterStream {
	pub fn new(config: Arc<FilterConfig>, client: Arc<dyn InjectClient>) -> Self {
		Self {
			config,
			client,
			state: State::NotTriggered,
			pending: None,
			response: None,
			action: None,
			buffered_data: Vec::new(),
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Evaluates triggers/antitriggers and, if the stream is eligible,
	/// dispatches the enrichment RPC. Detects whether the dispatch's
	/// callback fired synchronously by polling the returned future exactly
	/// once.
	pub fn decode_headers(
		&mut self,
		headers: &mut HeaderMap,
		_end_stream: bool,
		cb: &mut dyn PipelineCallbacks,
	) -> FilterStatus {
		let mut input_headers = Vec::new();
		let mut triggered = self.config.always_triggered;

		if !triggered {
			if matches_any(headers, &self.config.antitrigger_constraints) {
				return FilterStatus::Continue;
			}
			for constraint in &self.config.trigger_constraints {
				if matches(headers, constraint) {
					triggered = true;
					if !self.config.include_all_headers {
						if let Some(value) = headers.get(constraint.name.as_str()).and_then(|v| v.to_str().ok()) {
							input_headers.push(ProtoHeader { key: constraint.name.clone(), value: value.to_string() });
						}
					}
				}
			}
			for cookie_name in &self.config.trigger_cookie_names {
				if let Some(value) = cookie::get_named_cookie(headers, cookie_name) {
					triggered = true;
					if !self.config.include_all_headers {
						input_headers.push(ProtoHeader { key: format!("cookie.{cookie_name}"), value });
					}
				}
			}
		}

		if !triggered {
			return FilterStatus::Continue;
		}

		if self.config.include_all_headers {
			input_headers = headers
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|v| ProtoHeader { key: name.as_str().to_string(), value: v.to_string() })
				})
				.collect();
		} else {
			for name in &self.config.include_headers {
				if let Some(cookie_name) = name.strip_prefix("cookie.") {
					if let Some(value) = cookie::get_named_cookie(headers, cookie_name) {
						input_headers.push(ProtoHeader { key: name.clone(), value });
					}
				} else if let Some(value) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
					input_headers.push(ProtoHeader { key: name.clone(), value: value.to_string() });
				}
			}
		}

		let request = InjectRequest {
			input_headers,
			upstream_inject_names: self.config.upstream_inject_names.clone(),
			downstream_inject_names: self.config.downstream_inject_names.clone(),
			params: self.config.params.clone(),
		};

		self.state = State::SendingInjectRequest;
		let mut fut = self.client.send(request, self.config.timeout);

		// `Waker::noop()` never schedules a wakeup; a single poll here can
		// only observe a future that resolved without yielding. That's
		// exactly the synchronous-completion race this state machine exists
		// to detect.
		let waker = Waker::noop();
		let mut cx = Context::from_waker(waker);
		match fut.as_mut().poll(&mut cx) {
			Poll::Ready(result) => {
				self.handle_rpc_result(result, headers, cb);
				match self.state {
					State::Aborting => FilterStatus::StopIteration,
					State::WaitingForUpstream => FilterStatus::Continue,
					other => unreachable!("handle_rpc_result left state in {other:?}"),
				}
			}
			Poll::Pending => {
				self.pending = Some(fut);
				self.state = State::InjectRequestSent;
				FilterStatus::StopIteration
			}
		}
	}

	/// Drives the in-flight RPC to completion and applies its result. Called
	/// by the host once it can resume awaiting the stream (i.e. the
	/// asynchronous side of the race in [`Self::decode_headers`]). No-op if
	/// no RPC is pending (already resolved synchronously, or destroyed).
	pub async fn wait_for_inject_response(&mut self, headers: &mut HeaderMap, cb: &mut dyn PipelineCallbacks) {
		let Some(mut fut) = self.pending.take() else {
			return;
		};
		let result = std::future::poll_fn(|cx| fut.as_mut().poll(cx)).await;
		self.handle_rpc_result(result, headers, cb);
		match self.state {
			State::Aborting => {}
			State::WaitingForUpstream => cb.continue_decoding(),
			other => unreachable!("handle_rpc_result left state in {other:?}"),
		}
	}

	pub fn decode_data(&mut self, buf: Bytes, _end_stream: bool) -> DataStatus {
		match self.state {
			State::Aborting => DataStatus::StopIterationNoBuffer,
			State::InjectRequestSent => {
				self.buffered_data.push(buf);
				DataStatus::StopIterationAndBuffer
			}
			_ => DataStatus::Continue,
		}
	}

	pub fn decode_trailers(&mut self, _trailers: &mut HeaderMap) -> FilterStatus {
		match self.state {
			State::Aborting | State::InjectRequestSent => FilterStatus::StopIteration,
			_ => FilterStatus::Continue,
		}
	}

	/// Applies downstream mutations from the retained RPC response, if any.
	pub fn encode_headers(&mut self, headers: &mut HeaderMap, _end_stream: bool) -> FilterStatus {
		if self.state == State::NotTriggered {
			return FilterStatus::Continue;
		}
		if let (Some(response), Some(action)) = (&self.response, &self.action) {
			apply_injections(
				headers,
				&action.downstream_inject_headers,
				action.downstream_inject_any,
				&response.downstream_headers,
				&response.downstream_remove_names,
			);
			for name in &action.downstream_remove_headers {
				headers.remove(name.as_str());
			}
		}
		FilterStatus::Continue
	}

	/// This filter never inspects or mutates the response body.
	pub fn encode_data(&mut self, _buf: Bytes, _end_stream: bool) -> DataStatus {
		DataStatus::Continue
	}

	/// This filter never inspects or mutates response trailers.
	pub fn encode_trailers(&mut self, _trailers: &mut HeaderMap) -> FilterStatus {
		FilterStatus::Continue
	}

	/// Cancels any in-flight RPC (dropping the future suppresses its
	/// callback) and marks the stream done. Idempotent.
	pub fn on_destroy(&mut self) {
		self.pending = None;
		self.state = State::Done;
	}

	fn handle_rpc_result(
		&mut self,
		result: Result<InjectResponse, crate::error::RpcError>,
		headers: &mut HeaderMap,
		cb: &mut dyn PipelineCallbacks,
	) {
		match result {
			Ok(response) => {
				let action = self.config.actions.match_result(&response.result);
				self.response = Some(response);
				self.dispatch_action(action, headers, cb);
			}
			Err(err) => {
				tracing::debug!(error = %err, "inject rpc failed, resolving error action");
				self.response = None;
				let action = self.config.actions.error_action();
				self.dispatch_action(action, headers, cb);
			}
		}
	}

	fn dispatch_action(&mut self, action: Arc<Action>, headers: &mut HeaderMap, cb: &mut dyn PipelineCallbacks) {
		if action.kind == ActionKind::Dynamic {
			let opted_into_passthrough =
				matches!(self.response.as_ref().and_then(|r| r.action.as_deref()), Some("passthrough"));
			if opted_into_passthrough {
				self.action = Some(action);
				self.handle_pass_through(headers);
			} else {
				// response.action absent or unrecognized: treat as abort
				// with the error action rather than the dynamic action's
				// own (unset) abort fields.
				self.response = None;
				self.action = Some(self.config.actions.error_action());
				self.handle_abort(cb);
			}
			return;
		}

		self.action = Some(action.clone());
		match action.kind {
			ActionKind::Passthrough => self.handle_pass_through(headers),
			ActionKind::Abort => self.handle_abort(cb),
			ActionKind::Dynamic => unreachable!("dynamic handled above"),
		}
	}

	fn handle_pass_through(&mut self, headers: &mut HeaderMap) {
		let action = self.action.clone().expect("action resolved before handle_pass_through");
		if let Some(response) = &self.response {
			apply_injections(
				headers,
				&action.upstream_inject_headers,
				action.upstream_inject_any,
				&response.upstream_headers,
				&response.upstream_remove_names,
			);
		}
		for name in &action.upstream_remove_headers {
			headers.remove(name.as_str());
		}
		for cookie_name in &action.upstream_remove_cookie_names {
			cookie::remove_named_cookie_from_headers(cookie_name, headers);
		}
		self.state = State::WaitingForUpstream;
	}

	fn handle_abort(&mut self, cb: &mut dyn PipelineCallbacks) {
		let action = self.action.clone().expect("action resolved before handle_abort");

		let (code, body, extra_headers) = if action.use_rpc_response {
			match self.response.as_ref().filter(|r| r.response_code != 0) {
				Some(response) => (
					response.response_code as u16,
					response.response_body.clone(),
					response.response_headers.iter().map(|h| (h.key.clone(), h.value.clone())).collect::<Vec<_>>(),
				),
				None => (action.response_code, action.response_body.clone(), action.response_headers.clone()),
			}
		} else {
			(action.response_code, action.response_body.clone(), action.response_headers.clone())
		};

		let body = if body.is_empty() { None } else { Some(Bytes::from(body)) };
		self.state = State::Aborting;
		cb.send_local_response(code, extra_headers, body);
	}
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
