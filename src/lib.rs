pub mod annotation;
pub mod app;
pub mod audio;
pub mod cli;
pub mod client;
pub mod clipboard;
pub mod config;
pub mod filter;
pub mod output;
pub mod records;
pub mod runner;
pub mod toast;
pub mod view;

#[cfg(test)]
mod tests;
