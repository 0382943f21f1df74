pub mod filename;
pub mod scheduler;
pub mod session;
pub mod url_parser;
