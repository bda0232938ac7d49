/// アプリケーション設定
///
/// 環境変数からディスカバリ先、一覧取得ポリシー、スキャンモード、
/// リッスンアドレスを読み込む。AWSの認証情報とリージョンは
/// aws-configが環境から読み込むため、ここでは扱わない。
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

use crate::domain::AggregationPolicy;
use crate::infrastructure::ScanMode;

/// Cloud Map名前空間名の環境変数
pub const DISCOVERY_NAMESPACE_ENV: &str = "DISCOVERY_NAMESPACE";
/// Cloud Mapサービス名の環境変数
pub const DISCOVERY_SERVICE_ENV: &str = "DISCOVERY_SERVICE";
/// 一覧取得ポリシーの環境変数（lenient / strict）
pub const LIST_AGGREGATION_ENV: &str = "LIST_AGGREGATION";
/// スキャンモードの環境変数（paginated / single-page）
pub const SCAN_MODE_ENV: &str = "SCAN_MODE";
/// リッスンアドレスの環境変数
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";
/// リッスンポートの環境変数
pub const PORT_ENV: &str = "PORT";

/// デフォルトの名前空間名
pub const DEFAULT_DISCOVERY_NAMESPACE: &str = "course-app";
/// デフォルトのサービス名
pub const DEFAULT_DISCOVERY_SERVICE: &str = "course-table";
/// デフォルトのリッスンポート
pub const DEFAULT_PORT: u16 = 8080;

/// 設定読み込みのエラー型
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// 環境変数の値が解釈できない
    #[error("環境変数 {name} の値が不正です: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    discovery_namespace: String,
    discovery_service: String,
    aggregation_policy: AggregationPolicy,
    scan_mode: ScanMode,
    bind_addr: IpAddr,
    port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discovery_namespace: DEFAULT_DISCOVERY_NAMESPACE.to_string(),
            discovery_service: DEFAULT_DISCOVERY_SERVICE.to_string(),
            aggregation_policy: AggregationPolicy::default(),
            scan_mode: ScanMode::default(),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// 環境変数から設定を読み込み
    ///
    /// 未設定の変数はデフォルト値を使う。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込み
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let discovery_namespace =
            lookup(DISCOVERY_NAMESPACE_ENV).unwrap_or(defaults.discovery_namespace);
        let discovery_service = lookup(DISCOVERY_SERVICE_ENV).unwrap_or(defaults.discovery_service);

        let aggregation_policy = match lookup(LIST_AGGREGATION_ENV) {
            Some(value) => AggregationPolicy::parse(&value).ok_or(ConfigError::InvalidValue {
                name: LIST_AGGREGATION_ENV,
                value,
            })?,
            None => defaults.aggregation_policy,
        };

        let scan_mode = match lookup(SCAN_MODE_ENV) {
            Some(value) => ScanMode::parse(&value).ok_or(ConfigError::InvalidValue {
                name: SCAN_MODE_ENV,
                value,
            })?,
            None => defaults.scan_mode,
        };

        let bind_addr = match lookup(BIND_ADDR_ENV) {
            Some(value) => value.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                name: BIND_ADDR_ENV,
                value,
            })?,
            None => defaults.bind_addr,
        };

        let port = match lookup(PORT_ENV) {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value,
            })?,
            None => defaults.port,
        };

        Ok(Self {
            discovery_namespace,
            discovery_service,
            aggregation_policy,
            scan_mode,
            bind_addr,
            port,
        })
    }

    /// Cloud Map名前空間名を取得
    pub fn discovery_namespace(&self) -> &str {
        &self.discovery_namespace
    }

    /// Cloud Mapサービス名を取得
    pub fn discovery_service(&self) -> &str {
        &self.discovery_service
    }

    /// 一覧取得ポリシーを取得
    pub fn aggregation_policy(&self) -> AggregationPolicy {
        self.aggregation_policy
    }

    /// スキャンモードを取得
    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// リッスンするソケットアドレス
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
