pub mod extractors;
pub mod jwt;
pub mod pagination;
pub mod slug;
pub mod validation;
