/// 講座一覧の集約
///
/// スキャンで全IDを取得した後、IDごとにgetを並行して発行する。
/// 単一取得の「見つからない」と「失敗」の区別はここで吸収する。
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::domain::{AggregationPolicy, Course};
use crate::infrastructure::{CourseRepository, CourseRepositoryError};

/// スキャン + 個別取得で講座一覧を組み立てる
#[derive(Debug, Clone)]
pub struct ListAggregator<R>
where
    R: CourseRepository,
{
    repository: R,
    policy: AggregationPolicy,
}

impl<R> ListAggregator<R>
where
    R: CourseRepository,
{
    /// 新しいListAggregatorを作成
    pub fn new(repository: R, policy: AggregationPolicy) -> Self {
        Self { repository, policy }
    }

    /// 全講座を取得する
    ///
    /// # 処理フロー
    /// 1. scan_keysで全IDを取得（失敗はそのまま返す）
    /// 2. 各IDのgetを並行実行し、全ての完了を待つ
    /// 3. 取得できなかった講座はポリシーに従って除外またはエラー
    /// 4. ID昇順に並べて返す
    ///
    /// # 戻り値
    /// * `Ok(Vec<Course>)` - ID昇順の講座一覧（Lenientでは一部欠けることがある）
    /// * `Err(CourseRepositoryError)` - スキャン失敗、またはStrictでの取得失敗
    pub async fn list_all(&self, table_name: &str) -> Result<Vec<Course>, CourseRepositoryError> {
        let keys = self.repository.scan_keys(table_name).await?;

        let fetches = keys.iter().map(|&id| async move {
            (id, self.repository.get(table_name, id).await)
        });
        let results = join_all(fetches).await;

        let mut courses = Vec::with_capacity(results.len());
        let mut dropped = 0usize;

        for (id, result) in results {
            match result {
                Ok(Some(course)) => courses.push(course),
                Ok(None) => {
                    // スキャン後に削除された
                    dropped += 1;
                    debug!(course_id = id, "講座が見つからないためスキップ");
                }
                Err(e) => match self.policy {
                    AggregationPolicy::Lenient => {
                        dropped += 1;
                        warn!(course_id = id, error = %e, "講座の取得に失敗、スキップ");
                    }
                    AggregationPolicy::Strict => {
                        warn!(course_id = id, error = %e, "講座の取得に失敗、一覧取得を中断");
                        return Err(e);
                    }
                },
            }
        }

        courses.sort_by_key(|course| course.id);

        debug!(
            table_name = %table_name,
            key_count = keys.len(),
            course_count = courses.len(),
            dropped_count = dropped,
            "講座一覧を集約"
        );

        Ok(courses)
    }
}
