pub mod animation;
pub mod config;
pub mod demo_feed;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod game;
pub mod http_client;
pub mod logging;
pub mod scheduler;
pub mod state;
pub mod statsapi;
pub mod teams;
pub mod tracker;
