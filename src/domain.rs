// Domain layer modules
pub mod aggregation_policy;
pub mod course;
pub mod course_request;
pub mod course_response;

// Re-exports
pub use aggregation_policy::AggregationPolicy;
pub use course::Course;
pub use course_request::{CourseRequest, ParsedRequest, QueryParams, RequestError};
pub use course_response::{CourseResponse, ResponseBody};
