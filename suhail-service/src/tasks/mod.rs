pub mod company_research;
pub mod offer_assessment;
pub mod package_details;
pub mod prompts;
pub mod supervisor;
pub mod types;

pub use company_research::CompanyResearchTask;
pub use offer_assessment::OfferAssessmentTask;
pub use package_details::PackageDetailsTask;
pub use supervisor::SupervisorTask;
pub use types::{Persona, ToolCall, ToolName, session_keys};
