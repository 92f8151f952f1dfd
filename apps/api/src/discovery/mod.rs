pub mod analyzer;
pub mod handlers;
pub mod insights;
pub mod platforms;
pub mod prompts;
pub mod report;
pub mod stories;
