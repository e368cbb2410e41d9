use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::EcommerceError;

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        use EcommerceError::*;
        match self {
            Validation(_) | InvalidQuantity => StatusCode::BAD_REQUEST,
            Unauthenticated(_) | InvalidCredentials => StatusCode::UNAUTHORIZED,
            NotOwner(_) => StatusCode::FORBIDDEN,
            ProductNotFound
            | VariantOptionNotFound
            | CartNotFound
            | CartItemNotFound
            | OrderNotFound
            | AddressNotFound
            | WishlistNotFound => StatusCode::NOT_FOUND,
            CartCheckedOut | DuplicateUser | EmptyCart => StatusCode::CONFLICT,
            OrderFailed { .. } | Storage(_) | Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            EcommerceError::OrderFailed { order_id, .. } => {
                tracing::error!(error = %self, "Order failed");
                format!("Order {order_id} failed, the cart is still open")
            }
            EcommerceError::Storage(_) | EcommerceError::Database(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EcommerceError::NotOwner("cart").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            EcommerceError::CartCheckedOut.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EcommerceError::InvalidQuantity.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EcommerceError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
