pub mod catalog;
pub mod intent;
pub mod merchant;
pub mod product;
pub mod session;
