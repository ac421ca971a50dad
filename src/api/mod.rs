pub mod employee;
pub mod finance;
pub mod payroll;
