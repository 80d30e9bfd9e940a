//! 多语言聊天服务核心领域模型
//!
//! 包含用户、聊天室、消息等核心实体，以及连接、语言代码等值对象。

pub mod chat_room;
pub mod errors;
pub mod message;
pub mod user;
pub mod value_objects;

pub use chat_room::*;
pub use errors::*;
pub use message::*;
pub use user::*;
pub use value_objects::*;
