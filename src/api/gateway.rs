//! Thin client for the payment gateway service. The remote end is opaque;
//! this wrapper only creates checkout sessions, requests refunds and
//! checks webhook signatures.

use anyhow::{Context, Result};
use constant_time_eq::constant_time_eq;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::app_error::AppError;
use crate::core::config::GatewayConfig;

#[derive(Serialize, Debug)]
struct CheckoutReq<'a> {
    payment_id: Uuid,
    amount: f32,
    description: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct CheckoutSession {
    pub reference: String,
    pub checkout_url: String,
}

/// Open a checkout session for a freshly created payment row. The returned
/// reference is stored on the payment and echoed back by the webhook.
pub async fn create_checkout(
    client: Client,
    config: &GatewayConfig,
    payment_id: Uuid,
    amount: f32,
    description: &str,
) -> Result<CheckoutSession> {
    let session: CheckoutSession = client
        .post(format!("{}/checkout-sessions", config.base_url))
        .json(&CheckoutReq {
            payment_id,
            amount,
            description,
        })
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?
        .json()
        .await
        .context("Failed to parse checkout session")?;

    Ok(session)
}

#[derive(Serialize, Debug)]
struct RefundReq<'a> {
    reference: &'a str,
    amount: f32,
}

pub async fn refund(
    client: Client,
    config: &GatewayConfig,
    reference: &str,
    amount: f32,
) -> Result<()> {
    let response = client
        .post(format!("{}/refunds", config.base_url))
        .json(&RefundReq { reference, amount })
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("PaymentGateway".into()))?;

    if !response.status().is_success() {
        anyhow::bail!("Gateway refused refund for {reference}: {}", response.status());
    }
    Ok(())
}

/// Keyed digest over the raw webhook body, hex-encoded. The comparison is
/// constant-time; the payload is untrusted until this returns true.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(body);

    let expected: String = hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();

    constant_time_eq(
        expected.as_bytes(),
        signature.trim().to_ascii_lowercase().as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(b".");
        hasher.update(body);
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"event":"payment.succeeded"}"#;
        let signature = sign("topsecret", body);
        assert!(verify_signature("topsecret", body, &signature));
    }

    #[test]
    fn accepts_uppercase_hex_and_padding() {
        let body = b"payload";
        let signature = format!("  {}  ", sign("topsecret", body).to_ascii_uppercase());
        assert!(verify_signature("topsecret", body, &signature));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"payload";
        let signature = sign("other-secret", body);
        assert!(!verify_signature("topsecret", body, &signature));
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign("topsecret", b"payload");
        assert!(!verify_signature("topsecret", b"tampered", &signature));
    }
}
