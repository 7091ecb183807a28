//! Manager and SME dashboard figures.
//!
//! Seller counts and account counts come from the database. Business totals,
//! productivity outcomes and predictions are placeholders until a CRM feed
//! exists.

use rand::{Rng, seq::IndexedRandom};
use serde::Serialize;

use crate::{
    auth::Role,
    db::{RepositoryError, SqlChatRepository, SqlUserRepository},
    historical::{HistoricalDataset, SegmentStats},
};

const PLACEHOLDER_TOTAL_BUSINESS: f64 = 1_500_000.0;
const PLACEHOLDER_TARGET_ACHIEVEMENT: f64 = 75.5;
const RISK_LEVELS: [&str; 3] = ["Low", "Medium", "High"];
const RECOMMENDATIONS: [&str; 4] = [
    "Increase client engagement",
    "Focus on high-value prospects",
    "Schedule follow-up meetings",
    "Review pipeline strategy",
];

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_sellers: i64,
    pub total_accounts: usize,
    pub total_business: f64,
    pub target_achievement: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentClientStats {
    pub agent_id: i64,
    pub agent_name: String,
    pub client_count: usize,
    pub client_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerProductivity {
    pub seller_name: String,
    pub accounts_assigned: usize,
    pub accounts_closed: usize,
    pub quota_achievement: f64,
    pub risk_level: &'static str,
    pub potential_close: u32,
    pub ai_recommendation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtRiskDeal {
    pub client: &'static str,
    pub value: u32,
    pub risk_factor: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub client: &'static str,
    pub potential: u32,
    pub probability: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Predictions {
    pub year_end_prediction: u32,
    pub projected_closure: u32,
    pub at_risk_deals: Vec<AtRiskDeal>,
    pub top_opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerDashboard {
    pub summary: DashboardSummary,
    pub agent_stats: Vec<AgentClientStats>,
    pub productivity: Vec<SellerProductivity>,
    pub predictions: Predictions,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmeDashboard {
    pub total_contracts: usize,
    pub total_lives: f64,
    pub regions: Vec<String>,
    pub packages: Vec<String>,
    pub segments: Vec<SegmentStats>,
}

pub async fn dashboard_summary(
    users: &SqlUserRepository,
    chats: &SqlChatRepository,
) -> Result<DashboardSummary, RepositoryError> {
    Ok(DashboardSummary {
        total_sellers: users.count_by_role(Role::SalesAgent).await?,
        total_accounts: chats.client_names_for_role(Role::SalesAgent).await?.len(),
        total_business: PLACEHOLDER_TOTAL_BUSINESS,
        target_achievement: PLACEHOLDER_TARGET_ACHIEVEMENT,
    })
}

pub async fn agent_client_stats(
    users: &SqlUserRepository,
    chats: &SqlChatRepository,
) -> Result<Vec<AgentClientStats>, RepositoryError> {
    let mut stats = Vec::new();
    for agent in users.list_by_role(Role::SalesAgent).await? {
        let clients = chats.client_names(agent.id).await?;
        stats.push(AgentClientStats {
            agent_id: agent.id,
            agent_name: agent.username,
            client_count: clients.len(),
            client_list: clients,
        });
    }
    Ok(stats)
}

/// Real assigned-account counts with placeholder outcomes drawn from `rng`.
pub fn seller_productivity<R: Rng + ?Sized>(agents: &[AgentClientStats], rng: &mut R) -> Vec<SellerProductivity> {
    agents
        .iter()
        .map(|agent| {
            let assigned = agent.client_count;
            SellerProductivity {
                seller_name: agent.agent_name.clone(),
                accounts_assigned: assigned,
                accounts_closed: if assigned > 0 {
                    rng.random_range(1..=assigned)
                } else {
                    0
                },
                quota_achievement: rng.random_range(50.0..=120.0),
                risk_level: RISK_LEVELS.choose(rng).copied().unwrap_or("Low"),
                potential_close: rng.random_range(100_000..=1_000_000),
                ai_recommendation: RECOMMENDATIONS
                    .choose(rng)
                    .copied()
                    .unwrap_or(RECOMMENDATIONS[0]),
            }
        })
        .collect()
}

pub fn predictions() -> Predictions {
    Predictions {
        year_end_prediction: 4_500_000,
        projected_closure: 3_200_000,
        at_risk_deals: vec![
            AtRiskDeal { client: "Client A", value: 750_000, risk_factor: "High" },
            AtRiskDeal { client: "Client B", value: 500_000, risk_factor: "Medium" },
            AtRiskDeal { client: "Client C", value: 250_000, risk_factor: "High" },
        ],
        top_opportunities: vec![
            Opportunity { client: "Prospect X", potential: 1_200_000, probability: "80%" },
            Opportunity { client: "Prospect Y", potential: 800_000, probability: "65%" },
            Opportunity { client: "Prospect Z", potential: 600_000, probability: "75%" },
        ],
    }
}

pub async fn manager_dashboard(
    users: &SqlUserRepository,
    chats: &SqlChatRepository,
) -> Result<ManagerDashboard, RepositoryError> {
    let summary = dashboard_summary(users, chats).await?;
    let agent_stats = agent_client_stats(users, chats).await?;
    // ThreadRng is not Send, so it is only created after the last await.
    let productivity = seller_productivity(&agent_stats, &mut rand::rng());

    Ok(ManagerDashboard {
        summary,
        agent_stats,
        productivity,
        predictions: predictions(),
    })
}

/// Live figures embedded in the manager persona prompt.
pub fn manager_prompt_context(dashboard: &ManagerDashboard) -> String {
    let mut text = format!(
        "Team overview:\n- Total sellers: {}\n- Total accounts: {}\n- Total business: SAR {:.0}\n- Target achievement: {:.1}%\n",
        dashboard.summary.total_sellers,
        dashboard.summary.total_accounts,
        dashboard.summary.total_business,
        dashboard.summary.target_achievement
    );

    text.push_str("\nSales agents and their clients:\n");
    if dashboard.agent_stats.is_empty() {
        text.push_str("- No sales agents registered\n");
    }
    for agent in &dashboard.agent_stats {
        let clients = if agent.client_list.is_empty() {
            "no clients yet".to_string()
        } else {
            agent.client_list.join(", ")
        };
        text.push_str(&format!("- {} ({} clients): {}\n", agent.agent_name, agent.client_count, clients));
    }

    let predictions = &dashboard.predictions;
    text.push_str(&format!(
        "\nPredictions:\n- Year-end prediction: SAR {}\n- Projected closure: SAR {}\n",
        predictions.year_end_prediction, predictions.projected_closure
    ));
    for deal in &predictions.at_risk_deals {
        text.push_str(&format!(
            "- At risk: {} (SAR {}, {} risk)\n",
            deal.client, deal.value, deal.risk_factor
        ));
    }
    for opportunity in &predictions.top_opportunities {
        text.push_str(&format!(
            "- Opportunity: {} (SAR {}, {} probability)\n",
            opportunity.client, opportunity.potential, opportunity.probability
        ));
    }
    text
}

pub fn sme_dashboard(dataset: &HistoricalDataset) -> SmeDashboard {
    SmeDashboard {
        total_contracts: dataset.len(),
        total_lives: dataset.records().iter().map(|r| r.lives).sum(),
        regions: dataset.regions(),
        packages: dataset.packages(),
        segments: dataset.segment_stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, historical::tests::record};
    use rand::{SeedableRng, rngs::StdRng};

    fn agent(name: &str, clients: &[&str]) -> AgentClientStats {
        AgentClientStats {
            agent_id: 1,
            agent_name: name.to_string(),
            client_count: clients.len(),
            client_list: clients.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn productivity_placeholders_stay_in_range() {
        let agents = vec![agent("omar", &["Acme", "Globex", "Initech"]), agent("lina", &[])];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let rows = seller_productivity(&agents, &mut rng);
            assert_eq!(rows[0].accounts_assigned, 3);
            assert!((1..=3).contains(&rows[0].accounts_closed));
            assert_eq!(rows[1].accounts_closed, 0);
            assert!((50.0..=120.0).contains(&rows[0].quota_achievement));
            assert!((100_000..=1_000_000).contains(&rows[0].potential_close));
            assert!(RISK_LEVELS.contains(&rows[1].risk_level));
        }
    }

    #[tokio::test]
    async fn counts_sellers_and_distinct_accounts() {
        let pool = test_pool().await;
        let users = SqlUserRepository::new(pool.clone());
        let chats = SqlChatRepository::new(pool);

        let a = users.create("agent-a", "h", Role::SalesAgent, None).await.unwrap();
        let b = users.create("agent-b", "h", Role::SalesAgent, None).await.unwrap();
        let manager = users.create("boss", "h", Role::Manager, None).await.unwrap();

        chats.create(a.id, "Chat with Acme", Some("Acme")).await.unwrap();
        chats.create(a.id, "Chat with Acme", Some("Acme")).await.unwrap();
        chats.create(b.id, "Chat with Acme", Some("Acme")).await.unwrap();
        chats.create(b.id, "Chat with Globex", Some("Globex")).await.unwrap();
        chats.create(b.id, "General", None).await.unwrap();
        chats.create(manager.id, "Chat with Umbrella", Some("Umbrella")).await.unwrap();

        let dashboard = manager_dashboard(&users, &chats).await.unwrap();

        assert_eq!(dashboard.summary.total_sellers, 2);
        assert_eq!(dashboard.summary.total_accounts, 2);
        assert_eq!(dashboard.summary.total_business, 1_500_000.0);
        assert_eq!(dashboard.agent_stats[1].client_list, ["Acme", "Globex"]);
        assert_eq!(dashboard.productivity.len(), 2);

        let prompt = manager_prompt_context(&dashboard);
        assert!(prompt.contains("- Total sellers: 2"));
        assert!(prompt.contains("- agent-b (2 clients): Acme, Globex"));
        assert!(prompt.contains("Prospect X"));
    }

    #[test]
    fn sme_dashboard_aggregates_dataset() {
        let dataset = HistoricalDataset::new(vec![
            record("Central", "Gold", 100.0, 0.6, 1000.0, 50_000.0),
            record("Central", "Gold", 300.0, 0.8, 1200.0, 250_000.0),
            record("Eastern", "Basic", 50.0, 0.5, 300.0, 5_000.0),
        ]);

        let sme = sme_dashboard(&dataset);

        assert_eq!(sme.total_contracts, 3);
        assert_eq!(sme.total_lives, 450.0);
        assert_eq!(sme.segments.len(), 2);
        assert_eq!(sme.segments[0].contracts, 2);
        assert_eq!(sme.segments[0].claims_per_life, 750.0);
    }
}
