pub mod app_state;
pub mod handlers;
pub mod server;
pub mod upstream;
pub mod utils;
