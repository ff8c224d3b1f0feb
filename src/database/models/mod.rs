pub mod attendance;
pub mod company_config;
pub mod payroll;
pub mod super_admin;
pub mod task;
pub mod tenant;
pub mod user;

pub use attendance::{Attendance, AttendanceStatus, Break};
pub use company_config::CompanyConfig;
pub use payroll::Payroll;
pub use super_admin::SuperAdmin;
pub use task::{Task, TaskStatus};
pub use tenant::Tenant;
pub use user::{Role, SalaryType, User};
