pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod location;
pub mod motion;
pub mod sampler;
pub mod scheduler;
pub mod sensor;
pub mod session;
pub mod state;
