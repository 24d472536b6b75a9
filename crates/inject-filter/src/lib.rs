pub mod action;
pub mod config;
pub mod cookie;
pub mod error;
pub mod filter;
pub mod header_matcher;
pub mod rpc;

pub use action::{Action, ActionKind, ActionTable};
pub use config::{ConfigHandle, FilterConfig, RawConfig};
pub use filter::{DataStatus, FilterStatus, FilterStream, PipelineCallbacks, State};
pub use rpc::{GrpcInjectClient, InjectClient};
