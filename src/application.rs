// アプリケーション層モジュール
pub mod course_handler;
pub mod list_aggregator;

// 再エクスポート
pub use course_handler::{CourseHandler, CourseHandlerError};
pub use list_aggregator::ListAggregator;
