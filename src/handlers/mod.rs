pub mod geocode;
pub mod health;
pub mod home;
pub mod onsen_logs;
pub mod ws;
