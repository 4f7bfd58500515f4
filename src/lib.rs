pub mod activity;
pub mod auction;
pub mod auth;
pub mod backend;
pub mod bidding;
pub mod config;
pub mod currency;
pub mod error;
pub mod handlers;
pub mod products;
pub mod profile;
pub mod realtime;
pub mod routes;
pub mod watchlist;
