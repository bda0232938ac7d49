//! APIエラーハンドリング
//!
//! ハンドラーの想定外エラーを、講座レスポンスと同じエンベロープ形式
//! （`success: false`と`error`）のJSONで返す。内部のエラー内容は含めない。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::ResponseBody;

/// 想定外エラー時に返す汎用メッセージ
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// APIエラー
///
/// ステータスコードとJSON形式のエラーボディを含む。
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTPステータスコード
    status: StatusCode,
    /// エラーレスポンスボディ
    body: ResponseBody,
}

impl ApiError {
    /// 新しいApiErrorを作成
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody {
                success: false,
                action: None,
                error: Some(message.into()),
                all_courses: None,
            },
        }
    }

    /// 500 Internal Server Errorを作成（汎用メッセージ）
    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// エラーメッセージを取得
    pub fn message(&self) -> &str {
        self.body.error.as_deref().unwrap_or_default()
    }

    /// ステータスコードを取得
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
