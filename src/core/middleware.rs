use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::core::app_error::AppError;

/// Identity arrives from the edge gateway as plain id headers; session
/// handling lives upstream. A missing or malformed header is a 401.
fn id_header(headers: &HeaderMap, name: &'static str) -> Result<i32, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i32>().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing or invalid {name} header")))
}

pub async fn customers_authorization(
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = id_header(req.headers(), "x-user-id")?;
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

pub async fn providers_authorization(
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provider_id = id_header(req.headers(), "x-provider-id")?;
    req.extensions_mut().insert(provider_id);
    Ok(next.run(req).await)
}

pub async fn admins_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let admin_id = id_header(req.headers(), "x-admin-id")?;
    req.extensions_mut().insert(admin_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_numeric_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("42"));
        assert_eq!(id_header(&headers, "x-user-id").unwrap(), 42);
    }

    #[test]
    fn rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            id_header(&headers, "x-user-id"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-number"));
        assert!(matches!(
            id_header(&headers, "x-user-id"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
