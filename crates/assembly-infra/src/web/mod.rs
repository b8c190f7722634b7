mod core_config;
pub use self::core_config::*;
mod environment_config;
pub use self::environment_config::*;
mod problem_detail;
pub use self::problem_detail::*;
mod service_config;
pub use self::service_config::*;
mod web_config;
pub use self::web_config::*;
mod web_app;
pub use self::web_app::*;

pub mod controllers;
pub mod extracts;
