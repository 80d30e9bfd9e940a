//! Web API 层
//!
//! 提供 Axum 路由，把 HTTP 与 WebSocket 请求委托给应用层的用例服务。

mod error;
mod routes;
mod state;
mod websocket;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
