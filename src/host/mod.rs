pub mod chromium;
pub mod downloads;
pub mod traits;

#[cfg(test)]
pub mod mock;
