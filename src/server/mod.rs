mod handlers;
mod models;
mod process;
mod state;
mod util;

pub use handlers::{build_router, run_server};
