#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    build_scan_config, load_cookies_from_file, parse_cookie_string, parse_header_arg,
    parse_url_line,
};
