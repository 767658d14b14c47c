pub mod onsen_log;
