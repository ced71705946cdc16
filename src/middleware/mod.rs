mod client_ctx;

pub use client_ctx::{login_url_with_next, ClientCtx, LOGIN_URL};
