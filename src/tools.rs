pub mod traits;
pub mod error;
pub mod registry;
pub mod directive;
pub mod function;

pub use traits::Tool;
pub use error::ToolError;
pub use registry::{DuplicatePolicy, ToolRegistry};
pub use directive::CallInfo;
pub use function::FnTool;
