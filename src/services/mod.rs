pub mod comment_service;
pub mod listing_service;
pub mod post_service;
pub mod ranking;
pub mod vote_service;
