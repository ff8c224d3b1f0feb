pub mod attendance_service;
pub mod auth_service;
pub mod config_service;
pub mod payroll_service;
pub mod task_service;
pub mod tenant_service;
pub mod user_service;
