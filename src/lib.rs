pub mod cache;
pub mod comment;
pub mod config;
pub mod db;
pub mod feed;
pub mod filesystem;
pub mod follow;
pub mod form;
pub mod group;
pub mod middleware;
pub mod orm;
pub mod paginator;
pub mod post;
pub mod session;
pub mod user;
pub mod web;
