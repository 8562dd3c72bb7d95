pub mod cache;
pub mod chat;
pub mod onboard;
pub mod serve;
