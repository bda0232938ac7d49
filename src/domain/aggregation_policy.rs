/// 一覧取得時の個別取得失敗の扱い
///
/// Lenient: 取得に失敗した講座を黙って除外し、残りを成功として返す（既定）
/// Strict: 1件でも取得に失敗したら一覧全体を失敗とする
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationPolicy {
    #[default]
    Lenient,
    Strict,
}

impl AggregationPolicy {
    /// 設定値からポリシーを解釈する（大文字小文字は区別しない）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}
