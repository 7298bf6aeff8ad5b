pub mod alert;

pub use alert::AlertConfig;
