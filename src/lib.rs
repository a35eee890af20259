pub mod app;
pub mod config;
pub mod navigation;
pub mod paths;
pub mod retriever;
pub mod search;
pub mod store;
pub mod ui_model;

#[cfg(test)]
mod test_support;
