//! HTTP route modules

pub mod health;
pub mod security;

use actix_web::HttpResponse;

/// Success envelope for API responses
///
/// Error responses are produced by `MonitorError` instead, so every failure
/// shares one wire shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T>
where
    T: serde::Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Convert the API response to an HTTP response
    pub fn to_http_response(&self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, "test data");

        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized["success"], true);
        assert_eq!(serialized["data"], "test data");
    }
}
