//! Checkout sequence.
//!
//! Checkout is three separate API calls run in order: save the shipping
//! address to the profile, place an order from the cart, pay for it. Any
//! failure stops the sequence. If payment fails after the order exists, the
//! order is remembered as pending payment so the shopper can pay it later
//! without placing a second order.

use bindery_core::OrderId;
use thiserror::Error;
use tracing::instrument;

use crate::api::ApiError;
use crate::api::types::{PaymentDetails, PaymentReceipt, ProfileUpdate};
use crate::error::add_breadcrumb;
use crate::services::context::SessionContext;

/// Shipping and card fields submitted from the checkout form.
#[derive(Clone, Default, serde::Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
}

impl std::fmt::Debug for CheckoutForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutForm")
            .field("name", &self.name)
            .field("city", &self.city)
            .field("card_number", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Step of the checkout sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    SaveAddress,
    PlaceOrder,
    Payment,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SaveAddress => "saving your address",
            Self::PlaceOrder => "placing your order",
            Self::Payment => "processing payment",
        })
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Rejected before any request.
    #[error("{0}")]
    Validation(String),

    #[error("You need to log in first.")]
    NotAuthenticated,

    /// A step failed and nothing after it ran.
    #[error("Failed while {step}: {source}")]
    Failed {
        step: CheckoutStep,
        #[source]
        source: ApiError,
    },

    /// The order exists but payment failed.
    #[error("Order #{order_id} was placed but payment failed: {source}")]
    PaymentPending {
        order_id: OrderId,
        #[source]
        source: ApiError,
    },
}

impl CheckoutError {
    /// Message for the checkout page. Server messages are shown verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotAuthenticated => self.to_string(),
            Self::Failed { source, .. } | Self::PaymentPending { source, .. } => {
                source.user_message()
            }
        }
    }
}

/// A successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    pub receipt: PaymentReceipt,
}

const SHIPPING_FIELDS: [&str; 5] = ["name", "phone number", "address", "city", "postal code"];

impl CheckoutForm {
    /// Check every required field before anything is sent.
    ///
    /// # Errors
    ///
    /// Names the first missing field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        self.validate_shipping()?;
        self.validate_card()
    }

    fn validate_shipping(&self) -> Result<(), CheckoutError> {
        let values = [
            &self.name,
            &self.phone_number,
            &self.address_line1,
            &self.city,
            &self.postal_code,
        ];
        if let Some((label, _)) = SHIPPING_FIELDS
            .iter()
            .zip(values)
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(CheckoutError::Validation(format!(
                "Please fill in your {label}."
            )));
        }
        Ok(())
    }

    /// Card fields must be present; their format is the payment endpoint's call.
    fn validate_card(&self) -> Result<(), CheckoutError> {
        if self.card_number.trim().is_empty()
            || self.expiry.trim().is_empty()
            || self.cvv.trim().is_empty()
        {
            return Err(CheckoutError::Validation(
                "Please enter your card number, expiry date and CVV.".to_string(),
            ));
        }
        Ok(())
    }

    fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            address_line1: self.address_line1.trim().to_string(),
            address_line2: self.address_line2.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            password: None,
        }
    }

    fn payment(&self) -> PaymentDetails {
        PaymentDetails {
            card_number: self.card_number.chars().filter(|c| !c.is_whitespace()).collect(),
            expiry: self.expiry.trim().to_string(),
            cvv: self.cvv.trim().to_string(),
        }
    }
}

/// Run the full checkout sequence for the current cart.
///
/// # Errors
///
/// See [`CheckoutError`]. Validation and authentication failures happen
/// before any request.
#[instrument(skip(ctx, form))]
pub async fn checkout(
    ctx: &SessionContext,
    form: &CheckoutForm,
) -> Result<CheckoutOutcome, CheckoutError> {
    if !ctx.is_authenticated() {
        return Err(CheckoutError::NotAuthenticated);
    }
    form.validate()?;

    let api = ctx.api();

    api.update_profile(&form.profile_update())
        .await
        .map_err(|source| CheckoutError::Failed {
            step: CheckoutStep::SaveAddress,
            source,
        })?;

    let placed = api
        .place_order()
        .await
        .map_err(|source| CheckoutError::Failed {
            step: CheckoutStep::PlaceOrder,
            source,
        })?;
    let order_id = placed.order_id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    // The server empties the cart once the order exists
    let _ = ctx.cart().fetch().await;

    pay(ctx, placed.order_id, &form.payment()).await
}

/// Pay for an order placed by an earlier, interrupted checkout.
///
/// # Errors
///
/// Validation and authentication failures happen before any request;
/// a payment failure keeps the order pending.
#[instrument(skip(ctx, form))]
pub async fn retry_payment(
    ctx: &SessionContext,
    order_id: OrderId,
    form: &CheckoutForm,
) -> Result<CheckoutOutcome, CheckoutError> {
    if !ctx.is_authenticated() {
        return Err(CheckoutError::NotAuthenticated);
    }
    form.validate_card()?;

    pay(ctx, order_id, &form.payment()).await
}

async fn pay(
    ctx: &SessionContext,
    order_id: OrderId,
    payment: &PaymentDetails,
) -> Result<CheckoutOutcome, CheckoutError> {
    match ctx.api().process_payment(order_id, payment).await {
        Ok(receipt) => {
            ctx.complete_payment(receipt.invoice_html.clone()).await;
            tracing::info!(order_id = %order_id, "Payment completed");
            Ok(CheckoutOutcome { order_id, receipt })
        }
        Err(source) => {
            ctx.remember_pending_payment(order_id).await;
            tracing::warn!(order_id = %order_id, error = %source, "Payment failed; order left pending");
            Err(CheckoutError::PaymentPending { order_id, source })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete_form() -> CheckoutForm {
        CheckoutForm {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "555-0100".to_string(),
            address_line1: "12 Analytical Way".to_string(),
            address_line2: String::new(),
            city: "London".to_string(),
            postal_code: "N1 9GU".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_complete_form_validates() {
        assert!(complete_form().validate().is_ok());
    }

    #[test]
    fn test_blank_shipping_field_named() {
        let mut form = complete_form();
        form.city = "   ".to_string();

        let err = form.validate().unwrap_err();
        assert_eq!(err.user_message(), "Please fill in your city.");
    }

    #[test]
    fn test_address_line2_optional() {
        let mut form = complete_form();
        form.address_line2.clear();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_missing_card_rejected() {
        let mut form = complete_form();
        form.cvv.clear();
        assert!(matches!(form.validate(), Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_payment_strips_card_spaces() {
        let payment = complete_form().payment();
        assert_eq!(payment.card_number, "4111111111111111");
    }

    #[test]
    fn test_pending_error_shows_server_message() {
        let err = CheckoutError::PaymentPending {
            order_id: OrderId::new(7),
            source: ApiError::Server {
                status: reqwest::StatusCode::PAYMENT_REQUIRED,
                message: "Card declined".to_string(),
            },
        };
        assert_eq!(err.user_message(), "Card declined");
    }
}
