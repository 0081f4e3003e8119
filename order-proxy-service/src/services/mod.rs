pub mod diagnostics;
pub mod metrics;
pub mod provider;
pub mod redirect;

pub use metrics::{get_metrics, init_metrics};
pub use provider::{AccessToken, ProviderClient};
pub use redirect::{ExtractionStrategy, RedirectExtractor};
