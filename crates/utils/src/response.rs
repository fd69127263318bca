use serde::Serialize;
use ts_rs::TS;

/// Machine-readable failure category carried next to the human message.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    VendorUnavailable,
    ExtractionFailed,
    NotFound,
    PersistenceError,
}

/// Uniform response envelope: `{success, ...payload}` on success,
/// `{success: false, message, code}` on failure.
///
/// The payload is flattened into the top-level object so clients read
/// `content`, `creations` etc. directly next to `success`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(flatten)]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response that only carries a message.
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::{ApiResponse, ErrorCode};

    #[derive(Serialize)]
    struct Content {
        content: String,
    }

    #[test]
    fn success_payload_is_flattened() {
        let body = serde_json::to_value(ApiResponse::success(Content {
            content: "hello".to_string(),
        }))
        .unwrap();
        assert_eq!(body, json!({"success": true, "content": "hello"}));
    }

    #[test]
    fn error_carries_message_and_code() {
        let body = serde_json::to_value(ApiResponse::<Content>::error(
            ErrorCode::NotFound,
            "Creation not found",
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({"success": false, "message": "Creation not found", "code": "not_found"})
        );
    }

    #[test]
    fn message_only_success() {
        let body = serde_json::to_value(ApiResponse::ok_message("Creation Liked")).unwrap();
        assert_eq!(body, json!({"success": true, "message": "Creation Liked"}));
    }
}
