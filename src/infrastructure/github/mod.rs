pub mod github_repository_adapter;
