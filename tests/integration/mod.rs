//! Integration tests for crm-insight.

pub mod analytics_test;
pub mod mysql_test;
pub mod server_test;
pub mod service_test;
