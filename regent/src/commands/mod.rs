/// Request command handler
pub mod request;
