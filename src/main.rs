//! 講座APIサーバー
//!
//! `/`への全てのリクエストをクエリ文字列の`action`で振り分け、
//! Cloud Mapで解決したDynamoDBテーブルに対して講座のCRUDを行う。
//! - allCourses: 全講座の一覧
//! - addCourse: 講座の作成
//! - editCourse: 講座の更新
//! - removeCourse: 講座の削除

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_servicediscovery::Client as ServiceDiscoveryClient;
use course_api::application::CourseHandler;
use course_api::create_router;
use course_api::infrastructure::{
    AppConfig, CloudMapTableResolver, DynamoCourseRepository, init_logging,
};
use tokio::signal;

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
///
/// # Panics
/// シグナルハンドラーの登録に失敗した場合はパニックする。
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Ctrl+C シグナルハンドラーの登録に失敗しました");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM シグナルハンドラーの登録に失敗しました")
            .recv()
            .await;
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            tracing::info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// メイン関数
///
/// # 環境変数
/// - `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: aws-configが読み込む
/// - `DISCOVERY_NAMESPACE`, `DISCOVERY_SERVICE`: Cloud Mapの名前空間とサービス
/// - `LIST_AGGREGATION`: lenient（デフォルト）/ strict
/// - `SCAN_MODE`: paginated（デフォルト）/ single-page
/// - `BIND_ADDR`, `PORT`: リッスンアドレス（デフォルト: 0.0.0.0:8080）
/// - `RUST_LOG`: ログレベル（デフォルト: info）
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!("講座APIサーバーを起動します");

    let config = AppConfig::from_env()?;
    tracing::info!(
        namespace = config.discovery_namespace(),
        service = config.discovery_service(),
        aggregation_policy = ?config.aggregation_policy(),
        scan_mode = ?config.scan_mode(),
        "設定を読み込みました"
    );

    // 環境からAWS設定を読み込み（認証情報、リージョンなど）
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let resolver = CloudMapTableResolver::new(
        ServiceDiscoveryClient::new(&aws_config),
        config.discovery_namespace(),
        config.discovery_service(),
    );
    let repository = DynamoCourseRepository::new(DynamoDbClient::new(&aws_config))
        .with_scan_mode(config.scan_mode());
    let handler = CourseHandler::with_policy(resolver, repository, config.aggregation_policy());

    let app = create_router(handler);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("リッスン開始: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("サーバーが正常に停止しました");
    Ok(())
}
