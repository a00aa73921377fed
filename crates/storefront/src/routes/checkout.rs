//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
};
use bindery_core::OrderId;
use tracing::instrument;

use super::cart::CartView;
use super::{Layout, MessageQuery, Notice, redirect_with};
use crate::error::{AppError, Result};
use crate::middleware::auth::{Shopper, SignedIn};
use crate::services::checkout::{self, CheckoutForm, CheckoutOutcome};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub pending_order: Option<OrderId>,
}

/// Checkout success template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub layout: Layout,
    pub order_id: OrderId,
    pub message: String,
    pub has_invoice: bool,
    pub redirect_secs: u64,
}

/// Render the checkout page. Card fields are never echoed back.
async fn render(shopper: &Shopper, layout: Layout, mut form: CheckoutForm) -> CheckoutTemplate {
    let cart = shopper.ctx.cart();
    let view = match cart.fetch().await {
        Ok(fresh) => CartView::from(fresh.as_ref()),
        Err(_) => cart
            .snapshot()
            .map_or_else(CartView::empty, |snapshot| CartView::from(snapshot.as_ref())),
    };

    form.card_number.clear();
    form.expiry.clear();
    form.cvv.clear();

    CheckoutTemplate {
        layout,
        cart: view,
        form,
        pending_order: shopper.ctx.checkout_state().await.pending_payment,
    }
}

fn success(
    shopper: &Shopper,
    state: &AppState,
    outcome: CheckoutOutcome,
) -> CheckoutSuccessTemplate {
    CheckoutSuccessTemplate {
        layout: Layout::new(shopper, MessageQuery::default()),
        order_id: outcome.order_id,
        message: outcome.receipt.message,
        has_invoice: outcome.receipt.invoice_html.is_some(),
        redirect_secs: state.config().checkout_redirect_secs,
    }
}

/// Display the checkout form, prefilled from the profile.
#[instrument(skip(shopper))]
pub async fn show(
    SignedIn(shopper): SignedIn,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let form = match shopper.ctx.api().get_profile().await {
        Ok(profile) => CheckoutForm {
            name: profile.name,
            email: profile.email,
            phone_number: profile.phone_number,
            address_line1: profile.address_line1,
            address_line2: profile.address_line2,
            city: profile.city,
            postal_code: profile.postal_code,
            ..CheckoutForm::default()
        },
        Err(e) => {
            tracing::warn!("Failed to prefill checkout from profile: {e}");
            CheckoutForm::default()
        }
    };

    let layout = Layout::new(&shopper, notices);
    render(&shopper, layout, form).await
}

/// Run the checkout sequence.
#[instrument(skip(state, shopper, form))]
pub async fn submit(
    State(state): State<AppState>,
    SignedIn(shopper): SignedIn,
    Form(form): Form<CheckoutForm>,
) -> Response {
    match checkout::checkout(&shopper.ctx, &form).await {
        Ok(outcome) => success(&shopper, &state, outcome).into_response(),
        Err(e) => {
            let layout = Layout::new(&shopper, MessageQuery::default()).with_error(e.user_message());
            render(&shopper, layout, form).await.into_response()
        }
    }
}

/// Pay for the order left pending by an earlier checkout.
#[instrument(skip(state, shopper, form))]
pub async fn pay_pending(
    State(state): State<AppState>,
    SignedIn(shopper): SignedIn,
    Path(order_id): Path<OrderId>,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let pending = shopper.ctx.checkout_state().await.pending_payment;
    if pending != Some(order_id) {
        return redirect_with(
            "/checkout",
            Notice::Error,
            "That order is not awaiting payment.",
        )
        .into_response();
    }

    match checkout::retry_payment(&shopper.ctx, order_id, &form).await {
        Ok(outcome) => success(&shopper, &state, outcome).into_response(),
        Err(e) => {
            let layout = Layout::new(&shopper, MessageQuery::default()).with_error(e.user_message());
            render(&shopper, layout, form).await.into_response()
        }
    }
}

/// Invoice markup from the last successful payment.
#[instrument(skip(shopper))]
pub async fn invoice(SignedIn(shopper): SignedIn) -> Result<Html<String>> {
    shopper
        .ctx
        .checkout_state()
        .await
        .last_invoice
        .map(Html)
        .ok_or_else(|| AppError::NotFound("invoice".to_string()))
}
