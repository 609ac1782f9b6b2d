mod admin;
mod category;
mod order;
mod product;
mod user;

pub use admin::*;
pub use category::*;
pub use order::*;
pub use product::*;
pub use user::*;
