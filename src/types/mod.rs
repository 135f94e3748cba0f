mod comment;
mod issue;
mod project;
mod team;
mod user;
mod workflow_state;

pub use comment::Comment;
pub use issue::Issue;
pub use project::Project;
pub use team::Team;
pub use user::{User, Viewer};
pub use workflow_state::{StateType, WorkflowState};
