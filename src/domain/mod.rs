pub mod booking;
pub mod rating;
pub mod resource;
pub mod review;
pub mod tour;
pub mod user;
