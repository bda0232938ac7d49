/// 講座アクションハンドラー
///
/// リクエストごとにテーブル名を解決し、アクションに応じて
/// リポジトリ操作を振り分け、ステータスコード付きのレスポンスを組み立てる。
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::application::ListAggregator;
use crate::domain::{
    AggregationPolicy, Course, CourseRequest, CourseResponse, ParsedRequest, RequestError,
};
use crate::infrastructure::{CourseRepository, CourseRepositoryError, DiscoveryError, TableResolver};

/// テーブル名が解決できなかった場合のエラーメッセージ
pub const DATABASE_NOT_FOUND: &str = "Database not found";

/// ハンドラーの想定外エラー
///
/// 呼び出し元には詳細を返さず、ゲートウェイで500に変換する。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CourseHandlerError {
    /// ディスカバリ呼び出しそのものが失敗
    #[error("table resolution failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// 講座アクションを処理するハンドラー
pub struct CourseHandler<T, R>
where
    T: TableResolver,
    R: CourseRepository,
{
    /// テーブル名リゾルバー
    resolver: T,
    /// 講座リポジトリ
    repository: R,
    /// 一覧集約
    aggregator: ListAggregator<R>,
}

impl<T, R> CourseHandler<T, R>
where
    T: TableResolver,
    R: CourseRepository + Clone,
{
    /// 新しいCourseHandlerを作成（一覧取得はLenient）
    pub fn new(resolver: T, repository: R) -> Self {
        Self::with_policy(resolver, repository, AggregationPolicy::default())
    }

    /// 一覧取得ポリシーを指定してCourseHandlerを作成
    pub fn with_policy(resolver: T, repository: R, policy: AggregationPolicy) -> Self {
        let aggregator = ListAggregator::new(repository.clone(), policy);
        Self {
            resolver,
            repository,
            aggregator,
        }
    }

    /// リクエストを処理
    ///
    /// # 処理フロー
    /// 1. クエリが空なら400
    /// 2. テーブル名を解決（見つからなければパースエラーより先に500）
    /// 3. パースエラーなら400
    /// 4. アクションに応じてリポジトリ操作を実行
    ///
    /// # 戻り値
    /// * `Ok(CourseResponse)` - 呼び出し元に返すレスポンス（エラーレスポンスを含む）
    /// * `Err(CourseHandlerError)` - 想定外のエラー
    pub async fn handle(&self, request: ParsedRequest) -> Result<CourseResponse, CourseHandlerError> {
        if let Err(e @ RequestError::MissingAction) = &request {
            warn!(error = %e, "アクションが指定されていない");
            return Ok(CourseResponse::bad_request(e.to_string()));
        }

        let Some(table_name) = self.resolver.resolve_table_name().await? else {
            error!("テーブル名を解決できないためリクエストを処理できない");
            return Ok(CourseResponse::internal_error(DATABASE_NOT_FOUND));
        };

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "不正なリクエスト");
                return Ok(CourseResponse::bad_request(e.to_string()));
            }
        };

        Ok(self.dispatch(&table_name, request).await)
    }

    /// アクションごとの処理
    #[instrument(skip_all, fields(action = request.action(), table_name = %table_name))]
    async fn dispatch(&self, table_name: &str, request: CourseRequest) -> CourseResponse {
        let action = request.action();

        let result = match request {
            CourseRequest::ListAll => {
                return match self.aggregator.list_all(table_name).await {
                    Ok(courses) => {
                        info!(action, table_name = %table_name, count = courses.len(), "講座一覧を返却");
                        CourseResponse::listed(action, courses)
                    }
                    Err(e) => Self::store_failure(action, table_name, e),
                };
            }
            CourseRequest::AddCourse(course) => self.add_course(table_name, &course).await,
            CourseRequest::EditCourse(course) => self.edit_course(table_name, &course).await,
            CourseRequest::RemoveCourse { id } => self.repository.delete(table_name, id).await,
        };

        match result {
            Ok(()) => {
                info!(action, table_name = %table_name, "アクション完了");
                CourseResponse::ok(action)
            }
            Err(e) => Self::store_failure(action, table_name, e),
        }
    }

    async fn add_course(&self, table_name: &str, course: &Course) -> Result<(), CourseRepositoryError> {
        self.repository.put(table_name, course).await
    }

    /// 更新後のレコードはレスポンスに含めない
    async fn edit_course(&self, table_name: &str, course: &Course) -> Result<(), CourseRepositoryError> {
        self.repository.update(table_name, course).await.map(|_| ())
    }

    /// ストア操作の失敗を500に変換
    fn store_failure(action: &str, table_name: &str, e: CourseRepositoryError) -> CourseResponse {
        error!(action, table_name = %table_name, error = %e, "ストア操作エラー");
        CourseResponse::internal_error(format!("Error in {}: {}", action, e))
    }
}
