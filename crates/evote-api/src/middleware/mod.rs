//! # Middleware
//!
//! - [`metrics`]: Prometheus request metrics and the domain counters the
//!   voting workflow increments.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in
//! [`crate::app`]; admin authentication lives in [`crate::auth`].

pub mod metrics;
