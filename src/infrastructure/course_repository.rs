/// DynamoDBで講座レコードを管理するための講座リポジトリ
///
/// テーブル名はリクエストごとにCloud Mapから解決されるため、
/// 各操作の引数として受け取る。
use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Course;

/// パーティションキー属性名
pub const ATTR_ID: &str = "ID";
/// 講座名属性名
pub const ATTR_COURSE_NAME: &str = "CourseName";
/// カバー画像属性名
pub const ATTR_COVER_ART: &str = "CoverArt";
/// 講座URL属性名
pub const ATTR_COURSE_URL: &str = "CourseUrl";
/// 著者属性名
pub const ATTR_AUTHOR: &str = "Author";

/// 講座リポジトリ操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CourseRepositoryError {
    /// DynamoDBへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// DynamoDBからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// アイテムの変換に失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// DynamoDBアイテム
pub type DynamoItem = HashMap<String, AttributeValue>;

/// スキャン1ページ分の結果: (アイテム, LastEvaluatedKey)
type ScanPage = (Vec<DynamoItem>, Option<DynamoItem>);

/// スキャンのページ処理方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// LastEvaluatedKeyが無くなるまでスキャンを続ける
    #[default]
    Paginated,
    /// 最初の1ページのみ読む（1MBを超えるテーブルでは一部のキーが欠ける）
    SinglePage,
}

impl ScanMode {
    /// 設定値からスキャンモードを解釈する
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paginated" => Some(Self::Paginated),
            "single-page" | "single_page" => Some(Self::SinglePage),
            _ => None,
        }
    }

    /// スキャン結果の`LastEvaluatedKey`から次の開始キーを決める
    ///
    /// `None`ならスキャンを終了する。
    pub fn next_start_key(self, last_evaluated_key: Option<DynamoItem>) -> Option<DynamoItem> {
        match self {
            ScanMode::Paginated => last_evaluated_key,
            ScanMode::SinglePage => None,
        }
    }
}

/// 講座永続化用トレイト
///
/// 実際のDynamoDBとテスト用モックを差し替えられるように抽象化する。
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// 講座を保存（同一IDが存在すれば上書き）
    async fn put(&self, table_name: &str, course: &Course) -> Result<(), CourseRepositoryError>;

    /// ID以外の4フィールドを無条件に更新し、更新後の講座を返す
    async fn update(&self, table_name: &str, course: &Course) -> Result<Course, CourseRepositoryError>;

    /// IDで講座を取得
    ///
    /// # 戻り値
    /// * 見つかった場合は`Ok(Some(Course))`
    /// * 見つからなかった場合は`Ok(None)`
    /// * 失敗時は`Err(CourseRepositoryError)`
    async fn get(&self, table_name: &str, id: i64) -> Result<Option<Course>, CourseRepositoryError>;

    /// IDで講座を削除（存在しない場合も成功）
    async fn delete(&self, table_name: &str, id: i64) -> Result<(), CourseRepositoryError>;

    /// 全講座のIDを取得（ID属性のみを射影）
    async fn scan_keys(&self, table_name: &str) -> Result<Vec<i64>, CourseRepositoryError>;
}

/// CourseRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoCourseRepository {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// スキャンのページ処理方法
    scan_mode: ScanMode,
}

impl DynamoCourseRepository {
    /// 新しいDynamoCourseRepositoryを作成
    pub fn new(client: DynamoDbClient) -> Self {
        Self {
            client,
            scan_mode: ScanMode::default(),
        }
    }

    /// スキャンモードを設定
    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    /// パーティションキーの属性値
    fn id_value(id: i64) -> AttributeValue {
        AttributeValue::N(id.to_string())
    }

    /// 講座をDynamoDBアイテムに変換
    fn course_to_item(course: &Course) -> DynamoItem {
        HashMap::from([
            (ATTR_ID.to_string(), Self::id_value(course.id)),
            (
                ATTR_COURSE_NAME.to_string(),
                AttributeValue::S(course.course_name.clone()),
            ),
            (
                ATTR_COVER_ART.to_string(),
                AttributeValue::S(course.cover_art.clone()),
            ),
            (
                ATTR_COURSE_URL.to_string(),
                AttributeValue::S(course.course_url.clone()),
            ),
            (ATTR_AUTHOR.to_string(), AttributeValue::S(course.author.clone())),
        ])
    }

    /// アイテムからIDを読み取る
    fn id_from_item(item: &DynamoItem) -> Option<i64> {
        item.get(ATTR_ID)
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<i64>().ok())
    }

    /// DynamoDBアイテムを講座に変換
    ///
    /// IDは必須。文字列属性が欠けている場合は空文字として扱う。
    fn item_to_course(item: &DynamoItem) -> Result<Course, CourseRepositoryError> {
        let id = Self::id_from_item(item).ok_or_else(|| {
            CourseRepositoryError::SerializationError("Missing ID field".to_string())
        })?;

        let string_attr = |name: &str| {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .unwrap_or_default()
        };

        Ok(Course {
            id,
            course_name: string_attr(ATTR_COURSE_NAME),
            cover_art: string_attr(ATTR_COVER_ART),
            course_url: string_attr(ATTR_COURSE_URL),
            author: string_attr(ATTR_AUTHOR),
        })
    }

    /// ページごとにスキャンしてIDを集める
    ///
    /// `fetch_page`は開始キーを受け取り、1ページ分のアイテムと
    /// `LastEvaluatedKey`を返す。続行するかはスキャンモードで決める。
    async fn collect_keys<F, Fut>(
        table_name: &str,
        scan_mode: ScanMode,
        mut fetch_page: F,
    ) -> Result<Vec<i64>, CourseRepositoryError>
    where
        F: FnMut(Option<DynamoItem>) -> Fut,
        Fut: Future<Output = Result<ScanPage, CourseRepositoryError>>,
    {
        let mut keys = Vec::new();
        let mut start_key = None;
        let mut page_count = 0usize;

        loop {
            let (items, last_evaluated_key) = fetch_page(start_key.take()).await?;
            page_count += 1;

            for item in items {
                // IDが読めないアイテムは取得対象にしない
                match Self::id_from_item(&item) {
                    Some(id) => keys.push(id),
                    None => warn!(table_name = %table_name, "ID属性の無いアイテムをスキップ"),
                }
            }

            let has_more = last_evaluated_key.is_some();
            match scan_mode.next_start_key(last_evaluated_key) {
                Some(key) => start_key = Some(key),
                None => {
                    if has_more {
                        warn!(
                            table_name = %table_name,
                            key_count = keys.len(),
                            "単一ページモードのため残りのスキャンを打ち切り"
                        );
                    }
                    break;
                }
            }
        }

        debug!(table_name = %table_name, key_count = keys.len(), page_count, "キーのスキャン完了");
        Ok(keys)
    }
}

#[async_trait]
impl CourseRepository for DynamoCourseRepository {
    async fn put(&self, table_name: &str, course: &Course) -> Result<(), CourseRepositoryError> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(Self::course_to_item(course)))
            .send()
            .await
            .map_err(|e| CourseRepositoryError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn update(&self, table_name: &str, course: &Course) -> Result<Course, CourseRepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(table_name)
            .key(ATTR_ID, Self::id_value(course.id))
            .update_expression("SET #name = :name, #cover = :cover, #url = :url, #author = :author")
            .expression_attribute_names("#name", ATTR_COURSE_NAME)
            .expression_attribute_names("#cover", ATTR_COVER_ART)
            .expression_attribute_names("#url", ATTR_COURSE_URL)
            .expression_attribute_names("#author", ATTR_AUTHOR)
            .expression_attribute_values(":name", AttributeValue::S(course.course_name.clone()))
            .expression_attribute_values(":cover", AttributeValue::S(course.cover_art.clone()))
            .expression_attribute_values(":url", AttributeValue::S(course.course_url.clone()))
            .expression_attribute_values(":author", AttributeValue::S(course.author.clone()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| CourseRepositoryError::WriteError(e.into_service_error().to_string()))?;

        let attributes = result.attributes.ok_or_else(|| {
            CourseRepositoryError::SerializationError("UpdateItem returned no attributes".to_string())
        })?;

        Self::item_to_course(&attributes)
    }

    async fn get(&self, table_name: &str, id: i64) -> Result<Option<Course>, CourseRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(table_name)
            .key(ATTR_ID, Self::id_value(id))
            .send()
            .await
            .map_err(|e| CourseRepositoryError::ReadError(e.into_service_error().to_string()))?;

        result.item.as_ref().map(Self::item_to_course).transpose()
    }

    async fn delete(&self, table_name: &str, id: i64) -> Result<(), CourseRepositoryError> {
        self.client
            .delete_item()
            .table_name(table_name)
            .key(ATTR_ID, Self::id_value(id))
            .send()
            .await
            .map_err(|e| CourseRepositoryError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn scan_keys(&self, table_name: &str) -> Result<Vec<i64>, CourseRepositoryError> {
        let client = &self.client;

        Self::collect_keys(table_name, self.scan_mode, |start_key| async move {
            let result = client
                .scan()
                .table_name(table_name)
                .projection_expression("#id")
                .expression_attribute_names("#id", ATTR_ID)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| CourseRepositoryError::ReadError(e.into_service_error().to_string()))?;

            Ok::<ScanPage, CourseRepositoryError>((
                result.items.unwrap_or_default(),
                result.last_evaluated_key,
            ))
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ==================== モック講座リポジトリ ====================

    /// ユニットテスト用のモックCourseRepository
    ///
    /// テーブル名は区別せず、1つのマップに保存する。
    #[derive(Debug, Clone, Default)]
    pub struct MockCourseRepository {
        /// 保存された講座: id -> Course
        courses: Arc<Mutex<HashMap<i64, Course>>>,
        /// 次の書き込み・スキャン操作で返すエラー
        next_error: Arc<Mutex<Option<CourseRepositoryError>>>,
        /// getが失敗するID
        failing_gets: Arc<Mutex<HashSet<i64>>>,
        /// 全操作の呼び出し回数
        call_count: Arc<AtomicUsize>,
        /// 最後に操作したテーブル名
        last_table: Arc<Mutex<Option<String>>>,
    }

    impl MockCourseRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_courses(courses: Vec<Course>) -> Self {
            let repo = Self::new();
            {
                let mut map = repo.courses.lock().unwrap();
                for course in courses {
                    map.insert(course.id, course);
                }
            }
            repo
        }

        pub fn set_next_error(&self, error: CourseRepositoryError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        pub fn fail_get_for(&self, id: i64) {
            self.failing_gets.lock().unwrap().insert(id);
        }

        pub fn get_course(&self, id: i64) -> Option<Course> {
            self.courses.lock().unwrap().get(&id).cloned()
        }

        pub fn course_count(&self) -> usize {
            self.courses.lock().unwrap().len()
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn last_table(&self) -> Option<String> {
            self.last_table.lock().unwrap().clone()
        }

        fn record_call(&self, table_name: &str) -> Result<(), CourseRepositoryError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            *self.last_table.lock().unwrap() = Some(table_name.to_string());
            match self.next_error.lock().unwrap().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl CourseRepository for MockCourseRepository {
        async fn put(&self, table_name: &str, course: &Course) -> Result<(), CourseRepositoryError> {
            self.record_call(table_name)?;
            self.courses
                .lock()
                .unwrap()
                .insert(course.id, course.clone());
            Ok(())
        }

        async fn update(
            &self,
            table_name: &str,
            course: &Course,
        ) -> Result<Course, CourseRepositoryError> {
            self.record_call(table_name)?;
            self.courses
                .lock()
                .unwrap()
                .insert(course.id, course.clone());
            Ok(course.clone())
        }

        async fn get(&self, table_name: &str, id: i64) -> Result<Option<Course>, CourseRepositoryError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            *self.last_table.lock().unwrap() = Some(table_name.to_string());
            if self.failing_gets.lock().unwrap().contains(&id) {
                return Err(CourseRepositoryError::ReadError(format!(
                    "get failed for {}",
                    id
                )));
            }
            Ok(self.courses.lock().unwrap().get(&id).cloned())
        }

        async fn delete(&self, table_name: &str, id: i64) -> Result<(), CourseRepositoryError> {
            self.record_call(table_name)?;
            self.courses.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn scan_keys(&self, table_name: &str) -> Result<Vec<i64>, CourseRepositoryError> {
            self.record_call(table_name)?;
            Ok(self.courses.lock().unwrap().keys().copied().collect())
        }
    }

    fn sample_course() -> Course {
        Course {
            id: 1,
            course_name: "Algo".to_string(),
            cover_art: "/img/a.png".to_string(),
            course_url: "http://x.test".to_string(),
            author: "Ada".to_string(),
        }
    }

    // ==================== エラー型テスト ====================

    #[test]
    fn test_repository_error_display() {
        assert_eq!(
            CourseRepositoryError::WriteError("throttled".to_string()).to_string(),
            "Write error: throttled"
        );
        assert_eq!(
            CourseRepositoryError::ReadError("ResourceNotFoundException".to_string()).to_string(),
            "Read error: ResourceNotFoundException"
        );
        assert_eq!(
            CourseRepositoryError::SerializationError("Missing ID field".to_string()).to_string(),
            "Serialization error: Missing ID field"
        );
    }

    // ==================== ScanMode テスト ====================

    #[test]
    fn test_scan_mode_default_is_paginated() {
        assert_eq!(ScanMode::default(), ScanMode::Paginated);
    }

    #[test]
    fn test_scan_mode_parse() {
        assert_eq!(ScanMode::parse("paginated"), Some(ScanMode::Paginated));
        assert_eq!(ScanMode::parse("single-page"), Some(ScanMode::SinglePage));
        assert_eq!(ScanMode::parse("SINGLE_PAGE"), Some(ScanMode::SinglePage));
        assert_eq!(ScanMode::parse("all"), None);
    }

    fn key_item(id: i64) -> DynamoItem {
        HashMap::from([("ID".to_string(), AttributeValue::N(id.to_string()))])
    }

    /// 2ページ目が続くスキャン結果
    fn two_pages() -> Vec<ScanPage> {
        vec![
            (vec![key_item(1), key_item(2)], Some(key_item(2))),
            (vec![key_item(3)], None),
        ]
    }

    #[test]
    fn test_next_start_key_paginated_follows_key() {
        assert_eq!(
            ScanMode::Paginated.next_start_key(Some(key_item(7))),
            Some(key_item(7))
        );
        assert_eq!(ScanMode::Paginated.next_start_key(None), None);
    }

    #[test]
    fn test_next_start_key_single_page_always_stops() {
        assert_eq!(ScanMode::SinglePage.next_start_key(Some(key_item(7))), None);
        assert_eq!(ScanMode::SinglePage.next_start_key(None), None);
    }

    /// ページネーションモードでは全ページのIDを集める
    #[tokio::test]
    async fn test_collect_keys_paginated_reads_every_page() {
        let mut pages = two_pages().into_iter();
        let mut start_keys = Vec::new();

        let keys = DynamoCourseRepository::collect_keys("courses", ScanMode::Paginated, |start_key| {
            start_keys.push(start_key);
            std::future::ready(Ok(pages.next().unwrap_or_default()))
        })
        .await
        .unwrap();

        assert_eq!(keys, vec![1, 2, 3]);
        // 2ページ目は1ページ目のLastEvaluatedKeyから開始する
        assert_eq!(start_keys, vec![None, Some(key_item(2))]);
    }

    /// 単一ページモードでは続きがあっても最初のページで止める
    #[tokio::test]
    async fn test_collect_keys_single_page_stops_after_first_page() {
        let mut pages = two_pages().into_iter();
        let mut fetch_count = 0;

        let keys = DynamoCourseRepository::collect_keys("courses", ScanMode::SinglePage, |_| {
            fetch_count += 1;
            std::future::ready(Ok(pages.next().unwrap_or_default()))
        })
        .await
        .unwrap();

        assert_eq!(keys, vec![1, 2]);
        assert_eq!(fetch_count, 1);
    }

    #[tokio::test]
    async fn test_collect_keys_skips_items_without_id() {
        let page: ScanPage = (
            vec![
                key_item(4),
                HashMap::from([("CourseName".to_string(), AttributeValue::S("x".to_string()))]),
                key_item(5),
            ],
            None,
        );
        let mut pages = vec![page].into_iter();

        let keys = DynamoCourseRepository::collect_keys("courses", ScanMode::Paginated, |_| {
            std::future::ready(Ok(pages.next().unwrap_or_default()))
        })
        .await
        .unwrap();

        assert_eq!(keys, vec![4, 5]);
    }

    /// 途中のページで失敗したらそれまでのIDは返さずエラーにする
    #[tokio::test]
    async fn test_collect_keys_propagates_page_error() {
        let mut responses = vec![
            Ok((vec![key_item(1)], Some(key_item(1)))),
            Err(CourseRepositoryError::ReadError("throttled".to_string())),
        ]
        .into_iter();

        let result = DynamoCourseRepository::collect_keys("courses", ScanMode::Paginated, |_| {
            std::future::ready(responses.next().unwrap_or(Ok((Vec::new(), None))))
        })
        .await;

        assert_eq!(
            result,
            Err(CourseRepositoryError::ReadError("throttled".to_string()))
        );
    }

    // ==================== アイテム変換テスト ====================

    #[test]
    fn test_course_to_item_attributes() {
        let item = DynamoCourseRepository::course_to_item(&sample_course());

        assert_eq!(item.len(), 5);
        assert_eq!(item.get("ID"), Some(&AttributeValue::N("1".to_string())));
        assert_eq!(
            item.get("CourseName"),
            Some(&AttributeValue::S("Algo".to_string()))
        );
        assert_eq!(
            item.get("CoverArt"),
            Some(&AttributeValue::S("/img/a.png".to_string()))
        );
        assert_eq!(
            item.get("CourseUrl"),
            Some(&AttributeValue::S("http://x.test".to_string()))
        );
        assert_eq!(item.get("Author"), Some(&AttributeValue::S("Ada".to_string())));
    }

    #[test]
    fn test_item_to_course() {
        let item = DynamoCourseRepository::course_to_item(&sample_course());

        assert_eq!(
            DynamoCourseRepository::item_to_course(&item),
            Ok(sample_course())
        );
    }

    #[test]
    fn test_item_to_course_missing_strings_become_empty() {
        let item = HashMap::from([("ID".to_string(), AttributeValue::N("42".to_string()))]);

        let course = DynamoCourseRepository::item_to_course(&item).unwrap();
        assert_eq!(course.id, 42);
        assert_eq!(course.course_name, "");
        assert_eq!(course.author, "");
    }

    #[test]
    fn test_item_to_course_missing_id() {
        let item = HashMap::from([(
            "CourseName".to_string(),
            AttributeValue::S("Algo".to_string()),
        )]);

        assert_eq!(
            DynamoCourseRepository::item_to_course(&item),
            Err(CourseRepositoryError::SerializationError(
                "Missing ID field".to_string()
            ))
        );
    }

    /// IDが文字列型で保存されている場合は読み取れない
    #[test]
    fn test_id_from_item_requires_number_type() {
        let item = HashMap::from([("ID".to_string(), AttributeValue::S("1".to_string()))]);

        assert_eq!(DynamoCourseRepository::id_from_item(&item), None);
    }

    #[test]
    fn test_id_from_item_negative_and_zero() {
        let zero = HashMap::from([("ID".to_string(), AttributeValue::N("0".to_string()))]);
        let negative = HashMap::from([("ID".to_string(), AttributeValue::N("-3".to_string()))]);

        assert_eq!(DynamoCourseRepository::id_from_item(&zero), Some(0));
        assert_eq!(DynamoCourseRepository::id_from_item(&negative), Some(-3));
    }

    // ==================== MockCourseRepository テスト ====================

    #[tokio::test]
    async fn test_mock_repo_put_overwrites_same_id() {
        let repo = MockCourseRepository::new();
        let mut course = sample_course();

        repo.put("t", &course).await.unwrap();
        course.course_name = "Algo II".to_string();
        repo.put("t", &course).await.unwrap();

        assert_eq!(repo.course_count(), 1);
        assert_eq!(repo.get_course(1).unwrap().course_name, "Algo II");
    }

    #[tokio::test]
    async fn test_mock_repo_delete_non_existent_succeeds() {
        let repo = MockCourseRepository::new();

        assert!(repo.delete("t", 999).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_repo_next_error_is_consumed_once() {
        let repo = MockCourseRepository::new();
        repo.set_next_error(CourseRepositoryError::WriteError("unavailable".to_string()));

        assert!(repo.put("t", &sample_course()).await.is_err());
        assert!(repo.put("t", &sample_course()).await.is_ok());
        assert_eq!(repo.call_count(), 2);
        assert_eq!(repo.last_table().as_deref(), Some("t"));
    }
}
