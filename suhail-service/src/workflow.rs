use std::sync::Arc;

use suhail_flow::{Context, FlowRunner, Graph, GraphBuilder, SessionStorage, Task};

use crate::{
    historical::HistoricalDataset,
    llm::LanguageModel,
    research::GoogleSearch,
    tasks::*,
};

/// Messages kept in a chat's flow history and sent back to the model.
pub const MAX_CHAT_HISTORY: usize = 40;

fn tool_requested(context: &Context, tool: ToolName) -> bool {
    context
        .get_sync::<ToolCall>(session_keys::TOOL_CALL)
        .is_some_and(|call| call.name() == tool)
}

/// Supervisor at the center, one branch per tool. Tool tasks jump back to
/// the supervisor themselves.
pub fn build_suhail_workflow(
    llm: Arc<dyn LanguageModel>,
    dataset: Arc<HistoricalDataset>,
    research: Option<GoogleSearch>,
) -> Graph {
    let supervisor_task = Arc::new(SupervisorTask::new(llm.clone()));
    let supervisor_id = supervisor_task.id().to_string();

    let package_details_task = Arc::new(PackageDetailsTask::new(llm.clone()));
    let package_details_id = package_details_task.id().to_string();

    let offer_assessment_task = Arc::new(OfferAssessmentTask::new(llm, dataset));
    let offer_assessment_id = offer_assessment_task.id().to_string();

    let company_research_task = Arc::new(CompanyResearchTask::new(research));
    let company_research_id = company_research_task.id().to_string();

    GraphBuilder::new("suhail_chat")
        .add_task(supervisor_task)
        .add_task(package_details_task)
        .add_task(offer_assessment_task)
        .add_task(company_research_task)
        .add_edge_when(
            &supervisor_id,
            |ctx| tool_requested(ctx, ToolName::PackageDetails),
            &package_details_id,
        )
        .add_edge_when(
            &supervisor_id,
            |ctx| tool_requested(ctx, ToolName::OfferAssessment),
            &offer_assessment_id,
        )
        .add_edge_when(
            &supervisor_id,
            |ctx| tool_requested(ctx, ToolName::CompanyResearch),
            &company_research_id,
        )
        .set_start_task(&supervisor_id)
        .build()
}

pub fn create_flow_runner(
    session_storage: Arc<dyn SessionStorage>,
    llm: Arc<dyn LanguageModel>,
    dataset: Arc<HistoricalDataset>,
    research: Option<GoogleSearch>,
) -> FlowRunner {
    let graph = Arc::new(build_suhail_workflow(llm, dataset, research));
    FlowRunner::new(graph, session_storage).with_max_chat_messages(MAX_CHAT_HISTORY)
}
