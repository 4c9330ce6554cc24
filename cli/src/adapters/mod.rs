pub mod imap;
pub mod llm;
pub mod mail_server;
pub mod smtp;
