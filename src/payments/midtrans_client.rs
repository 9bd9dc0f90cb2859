use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha512};
use tracing::error;

use crate::domain::value_objects::gateway_notifications::GatewayNotification;

use super::{CheckoutSession, PaymentGateway, RefundReceipt};

/// Minimal Midtrans client built on reqwest: Snap checkout sessions, the
/// refund endpoint and notification signature verification.
pub struct MidtransClient {
    http: reqwest::Client,
    server_key: String,
    snap_base_url: String,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct SnapTransactionResponse {
    token: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    refund_id: Option<String>,
    refund_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MidtransErrorEnvelope {
    status_code: Option<String>,
    status_message: Option<String>,
    error_messages: Option<Vec<String>>,
}

/// Signature the gateway attaches to every notification:
/// SHA-512 over `order_id + status_code + gross_amount + server_key`,
/// hex-encoded.
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    hex::encode(signature_digest(order_id, status_code, gross_amount, server_key))
}

fn signature_digest(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hasher.finalize().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl MidtransClient {
    pub fn new(
        server_key: String,
        snap_base_url: String,
        api_base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            server_key,
            snap_base_url,
            api_base_url,
        })
    }

    fn auth_header(&self) -> String {
        // Basic auth with the server key as username and an empty password.
        format!("Basic {}", BASE64.encode(format!("{}:", self.server_key)))
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (gateway_status_code, gateway_status_message, gateway_error_messages) =
            match serde_json::from_str::<MidtransErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope.status_code,
                    envelope.status_message,
                    envelope.error_messages,
                ),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            gateway_status_code = ?gateway_status_code,
            gateway_status_message = ?gateway_status_message,
            gateway_error_messages = ?gateway_error_messages,
            response_body = %body,
            context = %context,
            "midtrans api request failed"
        );

        anyhow::bail!("Midtrans API request failed: {} (status {})", context, status);
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MidtransClient {
    /// Creates a Snap transaction and returns the hosted checkout session.
    async fn create_checkout(
        &self,
        order_id: &str,
        gross_amount_minor: i64,
        item_name: &str,
    ) -> Result<CheckoutSession> {
        let body = json!({
            "transaction_details": {
                "order_id": order_id,
                "gross_amount": gross_amount_minor,
            },
            "item_details": [{
                "id": order_id,
                "price": gross_amount_minor,
                "quantity": 1,
                "name": item_name,
            }],
        });

        let resp = self
            .http
            .post(format!("{}/snap/v1/transactions", self.snap_base_url))
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create snap transaction").await?;

        let parsed: SnapTransactionResponse = resp.json().await?;
        Ok(CheckoutSession {
            token: parsed.token,
            redirect_url: parsed.redirect_url,
        })
    }

    /// Requests a refund against a settled transaction.
    async fn refund(
        &self,
        order_id: &str,
        amount_minor: i64,
        reason: &str,
    ) -> Result<RefundReceipt> {
        let body = json!({
            "amount": amount_minor,
            "reason": reason,
        });

        let resp = self
            .http
            .post(format!("{}/v2/{}/refund", self.api_base_url, order_id))
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "refund transaction").await?;

        let parsed: RefundResponse = resp.json().await?;
        let refund_id = parsed
            .refund_id
            .or(parsed.refund_key)
            .ok_or_else(|| anyhow::anyhow!("Midtrans refund response is missing a refund id"))?;

        Ok(RefundReceipt { refund_id })
    }

    /// Recomputes the notification signature and compares in constant time.
    fn verify_signature(&self, notification: &GatewayNotification) -> bool {
        let expected = signature_digest(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &self.server_key,
        );

        let provided = match hex::decode(notification.signature_key.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        constant_time_eq(&expected, &provided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_KEY: &str = "SB-Mid-server-testkey";

    fn client() -> MidtransClient {
        MidtransClient::new(
            SERVER_KEY.to_string(),
            "https://app.sandbox.midtrans.com".to_string(),
            "https://api.sandbox.midtrans.com".to_string(),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    fn signed_notification() -> GatewayNotification {
        let order_id = "7f4c9ed0-1b2a-4df0-9a61-1c40e4a1f0aa";
        let status_code = "200";
        let gross_amount = "1000000.00";

        GatewayNotification {
            transaction_time: Some("2024-01-10 09:00:00".to_string()),
            transaction_status: "settlement".to_string(),
            transaction_id: "9aed5972-5b6a-401e-894b-a32c91ed1a3a".to_string(),
            status_message: Some("midtrans payment notification".to_string()),
            status_code: status_code.to_string(),
            signature_key: notification_signature(order_id, status_code, gross_amount, SERVER_KEY),
            settlement_time: None,
            payment_type: Some("bank_transfer".to_string()),
            order_id: order_id.to_string(),
            merchant_id: Some("G123456789".to_string()),
            gross_amount: gross_amount.to_string(),
            fraud_status: Some("accept".to_string()),
            currency: Some("IDR".to_string()),
        }
    }

    #[test]
    fn accepts_a_correctly_signed_notification() {
        assert!(client().verify_signature(&signed_notification()));
    }

    #[test]
    fn accepts_uppercase_hex_signatures() {
        let mut notification = signed_notification();
        notification.signature_key = notification.signature_key.to_uppercase();
        assert!(client().verify_signature(&notification));
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let mut notification = signed_notification();
        let mut tampered = notification.signature_key.into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        notification.signature_key = String::from_utf8(tampered).unwrap();
        assert!(!client().verify_signature(&notification));
    }

    #[test]
    fn rejects_a_signature_over_tampered_fields() {
        let mut notification = signed_notification();
        // Signature stays valid for the old amount, not the new one.
        notification.gross_amount = "1.00".to_string();
        assert!(!client().verify_signature(&notification));
    }

    #[test]
    fn rejects_non_hex_signatures() {
        let mut notification = signed_notification();
        notification.signature_key = "definitely-not-hex".to_string();
        assert!(!client().verify_signature(&notification));
    }

    #[test]
    fn signature_depends_on_every_field() {
        let base = notification_signature("order", "200", "1000.00", SERVER_KEY);
        assert_ne!(base, notification_signature("order2", "200", "1000.00", SERVER_KEY));
        assert_ne!(base, notification_signature("order", "201", "1000.00", SERVER_KEY));
        assert_ne!(base, notification_signature("order", "200", "1001.00", SERVER_KEY));
        assert_ne!(base, notification_signature("order", "200", "1000.00", "other-key"));
    }
}
