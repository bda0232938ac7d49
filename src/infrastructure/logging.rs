/// ログ基盤モジュール
///
/// 講座APIの構造化ログ設定。1行1イベントのJSONで出力し、
/// リクエスト処理中のイベントには現在のスパン（アクション名、テーブル名）を含める。
use std::sync::Once;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// JSON出力レイヤーを作成
///
/// イベントのフィールドはトップレベルに展開し、現在のスパンは`span`に入れる。
fn json_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
}

/// ログサブスクライバーを初期化する
///
/// `RUST_LOG`が未設定ならinfoレベル。複数回呼び出しても最初の1回だけ初期化する。
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // 既に他のサブスクライバーが設定されている場合は何もしない
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer(std::io::stdout))
            .try_init();
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
pub(crate) use capture::capture_logs;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_logging_idempotent() {
        init_test_logging();
        init_test_logging();
        init_test_logging();
    }

    /// 本番用の初期化も複数回呼び出してパニックしない
    #[test]
    fn test_init_logging_idempotent() {
        init_test_logging();
        init_logging();
        init_logging();
    }

    /// イベントのフィールドがトップレベルに展開される
    #[test]
    fn test_json_layer_flattens_event_fields() {
        let (_guard, logs) = capture_logs();

        tracing::warn!(course_id = 2, error = "timeout", "講座の取得に失敗");

        let line = logs.find("講座の取得に失敗").unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["course_id"], 2);
        assert_eq!(line["error"], "timeout");
        // スパンの外ではspanを持たない
        assert!(line.get("span").is_none());
    }

    #[test]
    fn test_captured_logs_ignore_other_threads() {
        let (_guard, logs) = capture_logs();

        std::thread::spawn(|| tracing::info!("別スレッドのログ"))
            .join()
            .unwrap();

        assert!(logs.find("別スレッドのログ").is_none());
    }
}
