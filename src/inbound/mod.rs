//! Inbound API: starts conversations and routes human replies.

pub mod http;
pub mod router;

pub use http::serve_http;
pub use router::{InboundRequest, InboundRouter, RouteAccepted, RouteAction};
