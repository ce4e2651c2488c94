pub mod conversation;
pub mod document;
pub mod message;
pub mod upload;
