use serde::{Deserialize, Serialize};
use serde_json::Number;
use validator::{Validate, ValidationError};

/// Body of `POST /create-order`.
///
/// Fields are optional at the serde level so that a missing value is reported
/// by validation (400) rather than by the JSON extractor.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_positive_amount"))]
pub struct OrderRequest {
    /// Amount in the provider's currency, forwarded verbatim.
    #[validate(required)]
    pub amount: Option<Number>,
    #[validate(required, length(min = 1))]
    pub description: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

fn validate_positive_amount(request: &OrderRequest) -> Result<(), ValidationError> {
    match &request.amount {
        Some(amount) if !amount.as_f64().is_some_and(|a| a > 0.0) => {
            Err(ValidationError::new("amount_not_positive"))
        }
        _ => Ok(()),
    }
}

impl OrderRequest {
    /// Caller-supplied return URL, ignoring empty strings.
    pub fn return_url(&self) -> Option<&str> {
        self.return_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub redirect_url: String,
}
