mod handlers;
mod page;
mod server;

pub use server::{router, DashboardServer, DashboardState};
