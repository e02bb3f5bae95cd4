pub mod pocketbase;
pub mod traits;
