use serde::{Deserialize, Serialize};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error_msg: None,
            data: Some(data),
            total: None,
        }
    }

    pub fn ok_list(data: T, total: u64) -> Self {
        Self {
            total: Some(total),
            ..Self::ok(data)
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_msg: Some(message.into()),
            data: None,
            total: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self {
            success: true,
            error_msg: None,
            data: None,
            total: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::ok_list(vec![1, 2], 2)).unwrap();
        assert_eq!(ok, json!({"success": true, "data": [1, 2], "total": 2}));

        let fail = serde_json::to_value(ApiResponse::<()>::fail("Shop not found: 1")).unwrap();
        assert_eq!(fail, json!({"success": false, "errorMsg": "Shop not found: 1"}));
    }
}
