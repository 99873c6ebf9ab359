pub mod gateways;
pub mod http;
