/// レスポンスエンベロープ
///
/// 全てのレスポンスボディは`success`を持ち、失敗時は`error`、
/// 成功時は`action`を持つ。一覧取得時は`allCourses`に講座一覧を含める。
use serde::{Deserialize, Serialize};

use crate::domain::Course;

/// 200 OK
pub const STATUS_OK: u16 = 200;
/// 400 Bad Request
pub const STATUS_BAD_REQUEST: u16 = 400;
/// 500 Internal Server Error
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// JSONレスポンスボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_courses: Option<Vec<Course>>,
}

/// ステータスコード付きレスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl CourseResponse {
    /// 200: アクション名のみを返す成功レスポンス
    pub fn ok(action: &str) -> Self {
        Self {
            status_code: STATUS_OK,
            body: ResponseBody {
                success: true,
                action: Some(action.to_string()),
                error: None,
                all_courses: None,
            },
        }
    }

    /// 200: 講座一覧を含む成功レスポンス
    pub fn listed(action: &str, courses: Vec<Course>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: ResponseBody {
                success: true,
                action: Some(action.to_string()),
                error: None,
                all_courses: Some(courses),
            },
        }
    }

    /// 400: 呼び出し元が修正可能なエラー
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::failure(STATUS_BAD_REQUEST, error)
    }

    /// 500: サーバー側のエラー
    pub fn internal_error(error: impl Into<String>) -> Self {
        Self::failure(STATUS_INTERNAL_SERVER_ERROR, error)
    }

    fn failure(status_code: u16, error: impl Into<String>) -> Self {
        Self {
            status_code,
            body: ResponseBody {
                success: false,
                action: None,
                error: Some(error.into()),
                all_courses: None,
            },
        }
    }
}
