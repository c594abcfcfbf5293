pub mod content;
pub mod slug;
