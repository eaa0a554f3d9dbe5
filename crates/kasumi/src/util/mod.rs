pub mod de;
pub mod http;
pub mod url;
