//! Redirect destination extraction.
//!
//! Providers hand back the checkout URL in different places. Each place is an
//! [`ExtractionStrategy`]; the configured [`OrderResponseMode`] fixes which
//! strategies run and in what order. The first non-empty match wins.

use crate::config::{OrderResponseMode, ProviderConfig};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `{"redirectUrl": "..."}`
    BodyField,
    /// `{"data": {"redirectUrl": "..."}}`
    NestedField,
    /// `location` header of a 3xx response.
    LocationHeader,
}

impl OrderResponseMode {
    pub fn strategies(&self) -> &'static [ExtractionStrategy] {
        match self {
            OrderResponseMode::Body => &[
                ExtractionStrategy::BodyField,
                ExtractionStrategy::NestedField,
            ],
            OrderResponseMode::Redirect => &[ExtractionStrategy::LocationHeader],
        }
    }
}

/// The parts of an order response a strategy may look at.
#[derive(Debug, Default)]
pub struct OrderResponseParts<'a> {
    pub body: Option<&'a Value>,
    pub location: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct RedirectExtractor {
    strategies: &'static [ExtractionStrategy],
    field: String,
    wrapper: String,
}

impl RedirectExtractor {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            strategies: config.order_response_mode.strategies(),
            field: config.redirect_field.clone(),
            wrapper: config.redirect_wrapper.clone(),
        }
    }

    /// Runs the strategies in priority order and returns the first hit.
    pub fn extract(&self, parts: &OrderResponseParts<'_>) -> Option<(ExtractionStrategy, String)> {
        self.strategies.iter().find_map(|strategy| {
            self.apply(*strategy, parts)
                .map(|destination| (*strategy, destination))
        })
    }

    fn apply(&self, strategy: ExtractionStrategy, parts: &OrderResponseParts<'_>) -> Option<String> {
        let found = match strategy {
            ExtractionStrategy::BodyField => parts.body?.get(&self.field)?.as_str(),
            ExtractionStrategy::NestedField => parts
                .body?
                .get(&self.wrapper)?
                .get(&self.field)?
                .as_str(),
            ExtractionStrategy::LocationHeader => parts.location,
        };

        found
            .map(str::trim)
            .filter(|destination| !destination.is_empty())
            .map(str::to_string)
    }
}
