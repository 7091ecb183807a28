//! The fixed health-insurance package catalog.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PackageTier {
    Basic,
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl PackageTier {
    pub const ALL: [PackageTier; 5] = [
        PackageTier::Basic,
        PackageTier::Bronze,
        PackageTier::Silver,
        PackageTier::Gold,
        PackageTier::Diamond,
    ];

    /// Accepts bare names (`gold`) as well as spreadsheet labels such as
    /// `D. Gold Package` or `E. Diamond Pacakge`.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|tier| label.contains(&tier.name().to_lowercase()))
    }

    pub fn name(self) -> &'static str {
        match self {
            PackageTier::Basic => "Basic",
            PackageTier::Bronze => "Bronze",
            PackageTier::Silver => "Silver",
            PackageTier::Gold => "Gold",
            PackageTier::Diamond => "Diamond",
        }
    }

    pub fn level(self) -> u8 {
        match self {
            PackageTier::Basic => 1,
            PackageTier::Bronze => 2,
            PackageTier::Silver => 3,
            PackageTier::Gold => 4,
            PackageTier::Diamond => 5,
        }
    }

    /// The tier one level down; `None` for Basic.
    pub fn next_lower(self) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.level() + 1 == self.level())
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoPayment {
    pub outpatient: &'static str,
    pub inpatient: &'static str,
    pub medications: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageBenefits {
    pub package_type: &'static str,
    pub eligibility: &'static str,
    pub annual_limit: &'static str,
    pub maternity_limit: &'static str,
    pub room_type: &'static str,
    pub network_class: &'static str,
    pub pre_existing_conditions: &'static str,
    pub maternity: &'static str,
    pub dental: &'static str,
    pub optical: &'static str,
    pub co_payment: CoPayment,
}

pub const PACKAGES: [PackageBenefits; 5] = [
    PackageBenefits {
        package_type: "Basic",
        eligibility: "All employees",
        annual_limit: "SAR 500,000",
        maternity_limit: "Not covered",
        room_type: "General ward",
        network_class: "Ministry approved only",
        pre_existing_conditions: "Covered after 12 months",
        maternity: "Not covered",
        dental: "Not covered",
        optical: "Not covered",
        co_payment: CoPayment {
            outpatient: "20%",
            inpatient: "0%",
            medications: "20%",
        },
    },
    PackageBenefits {
        package_type: "Bronze",
        eligibility: "All employees + family",
        annual_limit: "SAR 600,000",
        maternity_limit: "SAR 5,000",
        room_type: "Shared room",
        network_class: "Class C",
        pre_existing_conditions: "Covered after 12 months",
        maternity: "SAR 5,000",
        dental: "Emergency only",
        optical: "Not covered",
        co_payment: CoPayment {
            outpatient: "15%",
            inpatient: "0%",
            medications: "15%",
        },
    },
    PackageBenefits {
        package_type: "Silver",
        eligibility: "All employees + family",
        annual_limit: "SAR 1,000,000",
        maternity_limit: "SAR 10,000",
        room_type: "Shared room",
        network_class: "Class B",
        pre_existing_conditions: "Covered",
        maternity: "SAR 10,000",
        dental: "Covered up to SAR 2,000",
        optical: "SAR 1,000 every 2 years",
        co_payment: CoPayment {
            outpatient: "10%",
            inpatient: "0%",
            medications: "10%",
        },
    },
    PackageBenefits {
        package_type: "Gold",
        eligibility: "Senior management + family",
        annual_limit: "SAR 1,500,000",
        maternity_limit: "SAR 15,000",
        room_type: "Private room",
        network_class: "Class A",
        pre_existing_conditions: "Covered",
        maternity: "SAR 15,000",
        dental: "Covered up to SAR 3,000",
        optical: "SAR 1,500 every 2 years",
        co_payment: CoPayment {
            outpatient: "10%",
            inpatient: "0%",
            medications: "10%",
        },
    },
    PackageBenefits {
        package_type: "Diamond",
        eligibility: "Top executives + family",
        annual_limit: "SAR 2,000,000",
        maternity_limit: "SAR 20,000",
        room_type: "VIP suite",
        network_class: "VIP",
        pre_existing_conditions: "Covered",
        maternity: "SAR 20,000",
        dental: "Covered up to SAR 5,000",
        optical: "SAR 2,000 every year",
        co_payment: CoPayment {
            outpatient: "0%",
            inpatient: "0%",
            medications: "0%",
        },
    },
];

/// Benefit tables whose package name equals `name`, ignoring case. Unknown
/// names give an empty list.
pub fn package_details(name: &str) -> Vec<PackageBenefits> {
    let name = name.trim();
    PACKAGES
        .iter()
        .filter(|package| package.package_type.eq_ignore_ascii_case(name))
        .cloned()
        .collect()
}
