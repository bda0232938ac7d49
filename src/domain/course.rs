/// 講座レコード
///
/// JSONのキーはDynamoDBの属性名（ID, CourseName, CoverArt, CourseUrl, Author）と揃える。
/// CoverArtとCourseUrlはパーセントデコード済みの値を保持する。
use serde::{Deserialize, Serialize};

/// 講座エンティティ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// 講座ID（パーティションキー、呼び出し元が指定する）
    #[serde(rename = "ID")]
    pub id: i64,
    /// 講座名
    #[serde(rename = "CourseName")]
    pub course_name: String,
    /// カバー画像のURLまたはパス
    #[serde(rename = "CoverArt")]
    pub cover_art: String,
    /// 講座URL
    #[serde(rename = "CourseUrl")]
    pub course_url: String,
    /// 著者名
    #[serde(rename = "Author")]
    pub author: String,
}
