pub mod context;
pub mod filter;
pub mod git_ops;
pub mod github;
pub mod identity;
pub mod manager;
pub mod repo;

#[cfg(test)]
pub mod testing;
