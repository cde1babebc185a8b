pub mod csv_write;
pub mod date_system;
pub mod excel_read;
