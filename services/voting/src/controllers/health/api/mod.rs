mod service_status;
pub use self::service_status::*;
