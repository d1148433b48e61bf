// handlers/public/auth/mod.rs - token acquisition and account creation
pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;
pub mod session;

pub use login::post as login_post;
pub use logout::post as logout_post;
pub use refresh::post as refresh_post;
pub use register::post as register_post;
