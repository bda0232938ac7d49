//! HTTPゲートウェイ
//!
//! 単一のパス`/`で全てのHTTPメソッドを受け付け、クエリ文字列を
//! 型付きリクエストに変換して講座ハンドラーに渡す。ボディは読まない。
//! CORSは全てのオリジン・メソッド・ヘッダーを許可する。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::CourseHandler;
use crate::domain::{CourseRequest, CourseResponse, QueryParams};
use crate::error::ApiError;
use crate::infrastructure::{CourseRepository, TableResolver};

/// アプリケーション状態
pub struct AppState<T, R>
where
    T: TableResolver,
    R: CourseRepository,
{
    /// 講座ハンドラー
    pub handler: Arc<CourseHandler<T, R>>,
}

impl<T, R> Clone for AppState<T, R>
where
    T: TableResolver,
    R: CourseRepository,
{
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl IntoResponse for CourseResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// アクションエンドポイント（全メソッド）
///
/// # Returns
/// - 200 OK: アクション成功
/// - 400 Bad Request: アクション未指定・未知のアクション・不正なid
/// - 500 Internal Server Error: テーブル未解決・ストアエラー・想定外のエラー
async fn dispatch_action<T, R>(
    State(state): State<AppState<T, R>>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Response
where
    T: TableResolver + 'static,
    R: CourseRepository + Clone + 'static,
{
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());

    tracing::info!(
        method = %method,
        action = params.first("action").unwrap_or("(none)"),
        "アクションリクエストを受信"
    );

    match state.handler.handle(CourseRequest::parse(&params)).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            // 詳細はログにのみ残す
            let api_error = ApiError::internal_error();
            tracing::error!(
                error = %e,
                status = api_error.status().as_u16(),
                response_error = api_error.message(),
                "アクション処理中の想定外エラー"
            );
            api_error.into_response()
        }
    }
}

/// ルーターを構築する
///
/// `/`への全メソッドをアクションエンドポイントに振り分け、
/// CORSとリクエストトレーシングのレイヤーを適用する。
///
/// # Arguments
/// * `handler` - 講座ハンドラー
pub fn create_router<T, R>(handler: CourseHandler<T, R>) -> Router
where
    T: TableResolver + 'static,
    R: CourseRepository + Clone + 'static,
{
    let state = AppState {
        handler: Arc::new(handler),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", any(dispatch_action::<T, R>))
        .layer(cors)
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
