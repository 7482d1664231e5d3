pub mod commit_strategy;
pub mod orchestrator;
pub mod pipeline;
pub mod publisher;
pub mod release_strategy;

#[cfg(test)]
pub mod test_support;
