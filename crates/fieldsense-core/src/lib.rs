pub mod calibration;
pub mod db;
pub mod error;
