//! Maps settled Stripe payments to wallet top-ups. Webhook signature checks
//! happen before these conversions are reached.

use stripe::{CheckoutSession, CheckoutSessionPaymentStatus, PaymentIntent, PaymentIntentStatus};

use crate::middleware::error::AppError;
use crate::services::top_up_service::TopUpInput;

pub const USER_ID_METADATA_KEY: &str = "user_id";

impl TryFrom<&CheckoutSession> for TopUpInput {
    type Error = AppError;

    fn try_from(session: &CheckoutSession) -> Result<Self, Self::Error> {
        if session.payment_status != CheckoutSessionPaymentStatus::Paid {
            return Err(AppError::validation(format!(
                "checkout session {} is not paid",
                session.id
            )));
        }
        let user_id = session
            .client_reference_id
            .clone()
            .or_else(|| {
                session
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get(USER_ID_METADATA_KEY).cloned())
            })
            .ok_or_else(|| {
                AppError::validation(format!("checkout session {} has no user", session.id))
            })?;
        let amount = session.amount_total.unwrap_or_default();

        Ok(TopUpInput {
            user_id,
            amount,
            provider_session_id: session.id.to_string(),
        })
    }
}

impl TryFrom<&PaymentIntent> for TopUpInput {
    type Error = AppError;

    fn try_from(intent: &PaymentIntent) -> Result<Self, Self::Error> {
        if intent.status != PaymentIntentStatus::Succeeded {
            return Err(AppError::validation(format!(
                "payment intent {} has not succeeded",
                intent.id
            )));
        }
        let user_id = intent
            .metadata
            .get(USER_ID_METADATA_KEY)
            .cloned()
            .ok_or_else(|| {
                AppError::validation(format!("payment intent {} has no user", intent.id))
            })?;

        Ok(TopUpInput {
            user_id,
            amount: intent.amount_received,
            provider_session_id: intent.id.to_string(),
        })
    }
}
