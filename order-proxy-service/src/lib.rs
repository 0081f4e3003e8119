//! order-proxy-service: creates checkout orders with a buy-now-pay-later
//! provider on behalf of a storefront and hands back the redirect URL.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
