pub mod chat;
pub mod chat_stream;
pub mod errors;
pub mod index;
pub mod models;
pub mod request;
pub mod response;
