//! fedgate - Execution planning and result stitching for a federated
//! entity query gateway
//!
//! One logical entity query is routed to the backend sources able to serve
//! its attributes. At most one driver source filters, orders and paginates;
//! every other source enriches the driver's fixed id set.

pub mod catalog;
pub mod config;
pub mod context;
pub mod executor;
pub mod fetcher;
pub mod gateway;
pub mod observability;
pub mod planner;
pub mod request;

pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayError, GatewayResult};
