pub mod auth;
pub mod bookings;
pub mod contracts;
pub mod error;
pub mod images;
pub mod jwt;
pub mod mailer;
pub mod password;
pub mod query;
pub mod ratings;
pub mod resource;
pub mod reviews;
pub mod seed;
pub mod tours;
pub mod users;
