mod access;
mod models;
mod tier;

pub use access::AccessSet;
pub use models::*;
pub use tier::{Tier, Version};
