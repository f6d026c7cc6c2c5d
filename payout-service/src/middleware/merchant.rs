//! Merchant scoping extractor.
//!
//! Cafe-owner sessions are authenticated upstream; the gateway injects the
//! resolved merchant id as a header. Admin requests carry no header and pass
//! an explicit `merchantId` query parameter instead. The aggregation core
//! only ever sees the resolved id.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const MERCHANT_ID_HEADER: &str = "X-Merchant-Id";

/// Merchant scope from the `X-Merchant-Id` header, when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct MerchantScope {
    pub merchant_id: Option<Uuid>,
}

#[async_trait]
impl<S> FromRequestParts<S> for MerchantScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts
            .headers
            .get(MERCHANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(Self::default());
        };

        let merchant_id = raw.parse::<Uuid>().map_err(|_| {
            AppError::AuthError(anyhow::anyhow!(
                "Invalid {} header (must be a UUID)",
                MERCHANT_ID_HEADER
            ))
        })?;

        Ok(Self {
            merchant_id: Some(merchant_id),
        })
    }
}
