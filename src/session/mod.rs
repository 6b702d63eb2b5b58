pub mod controller;
pub mod state;
pub mod text;

pub use controller::{Collaborators, SessionController};
