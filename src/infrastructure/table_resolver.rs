/// Cloud Mapからテーブル名を解決するテーブルリゾルバー
///
/// 名前空間とサービス名で`DiscoverInstances`を呼び出し、
/// `role=dynamodb-table`のインスタンスの`tablename`属性を読み取る。
/// 結果はキャッシュせず、リクエストごとに解決する。
use async_trait::async_trait;
use aws_sdk_servicediscovery::Client as ServiceDiscoveryClient;
use aws_sdk_servicediscovery::types::HttpInstanceSummary;
use thiserror::Error;
use tracing::{debug, warn};

/// インスタンスを絞り込むクエリパラメータのキー
pub const ROLE_QUERY_KEY: &str = "role";
/// テーブルを表すインスタンスのロール
pub const TABLE_ROLE: &str = "dynamodb-table";
/// テーブル名を保持するインスタンス属性
pub const TABLE_NAME_ATTRIBUTE: &str = "tablename";

/// ディスカバリ呼び出しのエラー型
///
/// 「インスタンスが見つからない」は`Ok(None)`で表し、ここには含めない。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiscoveryError {
    /// Cloud Map APIの呼び出しに失敗
    #[error("Cloud Map API error: {0}")]
    ServiceError(String),
}

/// テーブル名解決用トレイト
#[async_trait]
pub trait TableResolver: Send + Sync {
    /// バックエンドのテーブル名を解決する
    ///
    /// # 戻り値
    /// * 見つかった場合は`Ok(Some(table_name))`
    /// * インスタンスが無い、または属性が無い場合は`Ok(None)`
    /// * ディスカバリ呼び出しが失敗した場合は`Err(DiscoveryError)`
    async fn resolve_table_name(&self) -> Result<Option<String>, DiscoveryError>;
}

/// TableResolverのCloud Map実装
#[derive(Debug, Clone)]
pub struct CloudMapTableResolver {
    client: ServiceDiscoveryClient,
    namespace_name: String,
    service_name: String,
}

impl CloudMapTableResolver {
    /// 新しいCloudMapTableResolverを作成
    ///
    /// # 引数
    /// * `client` - Cloud Mapクライアント
    /// * `namespace_name` - 名前空間名
    /// * `service_name` - サービス名
    pub fn new(
        client: ServiceDiscoveryClient,
        namespace_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace_name: namespace_name.into(),
            service_name: service_name.into(),
        }
    }

    /// 最初のインスタンスからテーブル名属性を取り出す
    fn table_name_from_instances(instances: &[HttpInstanceSummary]) -> Option<String> {
        instances
            .first()
            .and_then(|instance| instance.attributes())
            .and_then(|attributes| attributes.get(TABLE_NAME_ATTRIBUTE))
            .cloned()
    }
}

#[async_trait]
impl TableResolver for CloudMapTableResolver {
    async fn resolve_table_name(&self) -> Result<Option<String>, DiscoveryError> {
        let output = self
            .client
            .discover_instances()
            .namespace_name(&self.namespace_name)
            .service_name(&self.service_name)
            .query_parameters(ROLE_QUERY_KEY, TABLE_ROLE)
            .send()
            .await
            .map_err(|e| DiscoveryError::ServiceError(e.into_service_error().to_string()))?;

        let instances = output.instances();
        let table_name = Self::table_name_from_instances(instances);

        match &table_name {
            Some(name) => debug!(
                namespace = %self.namespace_name,
                service = %self.service_name,
                table_name = %name,
                "テーブル名を解決"
            ),
            None => warn!(
                namespace = %self.namespace_name,
                service = %self.service_name,
                instance_count = instances.len(),
                "テーブルのインスタンスが見つからない"
            ),
        }

        Ok(table_name)
    }
}
