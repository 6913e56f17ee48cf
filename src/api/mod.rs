pub mod dispatch;
pub mod server;

pub use dispatch::{dispatch, Reply};
pub use server::{build_router, serve};
