pub mod pets;
pub mod reels;
pub mod users;
