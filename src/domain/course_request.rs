/// リクエストパーサー
///
/// クエリ文字列をパースし、アクションごとの型付きリクエストに変換する。
/// 値のパーセントデコードはパース時に一度だけ行われるため、
/// CoverArtやCourseUrlはエンコードされて送られてきてもデコード済みで保持される。
use std::collections::HashMap;

use thiserror::Error;

use crate::domain::Course;

/// 講座一覧アクション名
pub const ACTION_ALL_COURSES: &str = "allCourses";
/// 講座追加アクション名
pub const ACTION_ADD_COURSE: &str = "addCourse";
/// 講座編集アクション名
pub const ACTION_EDIT_COURSE: &str = "editCourse";
/// 講座削除アクション名
pub const ACTION_REMOVE_COURSE: &str = "removeCourse";

/// クエリ文字列パラメータ
///
/// 同じキーが複数回現れた場合は出現順にすべて保持する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// 生のクエリ文字列（`?`を含まない）をパースする
    ///
    /// `application/x-www-form-urlencoded`の規則でデコードする（`+`は空白）。
    pub fn parse(query: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self { params }
    }

    /// パラメータが1つも無いかどうか
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// キーに対応する全ての値
    pub fn values(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// キーに対応する最初の値
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }
}

/// 型付きリクエスト
#[derive(Debug, Clone, PartialEq)]
pub enum CourseRequest {
    /// allCourses: 全講座の一覧
    ListAll,
    /// addCourse: 講座の作成（同一IDは上書き）
    AddCourse(Course),
    /// editCourse: ID以外の4フィールドを置換
    EditCourse(Course),
    /// removeCourse: 講座の削除
    RemoveCourse { id: i64 },
}

/// パース結果
///
/// 不正なリクエストでもテーブル解決は先に行うため、エラーのままハンドラーに渡す。
pub type ParsedRequest = Result<CourseRequest, RequestError>;

/// リクエストのパースエラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RequestError {
    /// クエリが空
    #[error("Invalid Request: Action not provided")]
    MissingAction,

    /// 未知のアクション（空文字・省略・複数指定を含む）
    ///
    /// `type_name`は値の実行時の型名: 通常は`string`、省略時は`undefined`、
    /// 複数指定時は`object`。
    #[error("Invalid Request: Action {value} {type_name} not found")]
    UnknownAction {
        value: String,
        type_name: &'static str,
    },

    /// idが指定されていない
    #[error("Invalid Request: id is required for {action}")]
    MissingId { action: &'static str },

    /// idが整数として解釈できない
    #[error("Invalid Request: id {value} is not a number")]
    InvalidId { value: String },
}

impl CourseRequest {
    /// クエリパラメータを型付きリクエストに変換する
    ///
    /// # 例
    /// ```
    /// use course_api::domain::{CourseRequest, QueryParams};
    ///
    /// let params = QueryParams::parse("action=removeCourse&id=3");
    /// assert_eq!(CourseRequest::parse(&params), Ok(CourseRequest::RemoveCourse { id: 3 }));
    /// ```
    pub fn parse(params: &QueryParams) -> ParsedRequest {
        if params.is_empty() {
            return Err(RequestError::MissingAction);
        }

        let action = match params.values("action") {
            [single] => single.as_str(),
            [] => {
                return Err(RequestError::UnknownAction {
                    value: "undefined".to_string(),
                    type_name: "undefined",
                });
            }
            many => {
                return Err(RequestError::UnknownAction {
                    value: many.join(","),
                    type_name: "object",
                });
            }
        };

        match action {
            ACTION_ALL_COURSES => Ok(CourseRequest::ListAll),
            ACTION_ADD_COURSE => Ok(CourseRequest::AddCourse(Self::parse_course(
                params,
                ACTION_ADD_COURSE,
            )?)),
            ACTION_EDIT_COURSE => Ok(CourseRequest::EditCourse(Self::parse_course(
                params,
                ACTION_EDIT_COURSE,
            )?)),
            ACTION_REMOVE_COURSE => Ok(CourseRequest::RemoveCourse {
                id: Self::parse_id(params, ACTION_REMOVE_COURSE)?,
            }),
            other => Err(RequestError::UnknownAction {
                value: other.to_string(),
                type_name: "string",
            }),
        }
    }

    /// アクション名を取得
    pub fn action(&self) -> &'static str {
        match self {
            CourseRequest::ListAll => ACTION_ALL_COURSES,
            CourseRequest::AddCourse(_) => ACTION_ADD_COURSE,
            CourseRequest::EditCourse(_) => ACTION_EDIT_COURSE,
            CourseRequest::RemoveCourse { .. } => ACTION_REMOVE_COURSE,
        }
    }

    /// idを整数としてパース
    fn parse_id(params: &QueryParams, action: &'static str) -> Result<i64, RequestError> {
        let value = params
            .first("id")
            .ok_or(RequestError::MissingId { action })?;

        value
            .trim()
            .parse::<i64>()
            .map_err(|_| RequestError::InvalidId {
                value: value.to_string(),
            })
    }

    /// 講座フィールドをパース
    ///
    /// id以外のフィールドは省略されても空文字として扱う。
    fn parse_course(params: &QueryParams, action: &'static str) -> Result<Course, RequestError> {
        let id = Self::parse_id(params, action)?;
        let field = |key: &str| params.first(key).unwrap_or_default().to_string();

        Ok(Course {
            id,
            course_name: field("courseName"),
            cover_art: field("courseCoverArt"),
            course_url: field("courseUrl"),
            author: field("courseAuthor"),
        })
    }
}
