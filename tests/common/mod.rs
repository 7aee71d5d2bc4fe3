//! Shared test utilities

pub mod fixtures;
pub mod mock_editor;
pub mod mock_platform;
pub mod mock_repo;

pub use fixtures::*;
pub use mock_editor::{Reply, ScriptedEditor};
pub use mock_platform::{Call, MockPlatformService};
pub use mock_repo::MockRepository;
