pub mod attendance;
pub mod auth;
pub mod breaks;
pub mod company;
pub mod faces;
pub mod payroll;
pub mod super_admin;
pub mod tasks;
pub mod tenants;
pub mod users;
