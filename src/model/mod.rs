pub mod employee;
pub mod invoice;
pub mod payroll;
