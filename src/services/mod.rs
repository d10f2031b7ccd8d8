pub mod api;
pub mod auth;
pub mod closet;
pub mod fitting;
pub mod onboarding;
pub mod outfits;
pub mod poller;
pub mod profile;
pub mod progress;
pub mod slots;
mod upload;
pub mod workflow;
