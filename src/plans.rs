//! Static pricing tiers shown on the plans page. No billing behind them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPrice {
    /// Monthly price in whole US dollars.
    Monthly(u32),
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanTier {
    pub name: &'static str,
    pub price: PlanPrice,
    pub description: &'static str,
    /// `None` means unlimited.
    pub technician_limit: Option<u32>,
    pub features: &'static [&'static str],
    pub accent_color: &'static str,
    pub call_to_action: &'static str,
    pub popular: bool,
}

impl PlanTier {
    pub fn price_label(&self) -> String {
        match self.price {
            PlanPrice::Monthly(dollars) => format!("${dollars}"),
            PlanPrice::Custom => "Custom".to_string(),
        }
    }
}

pub const PLANS: [PlanTier; 3] = [
    PlanTier {
        name: "Starter",
        price: PlanPrice::Monthly(199),
        description: "Perfect for small teams getting started",
        technician_limit: Some(10),
        features: &[
            "Up to 10 technicians",
            "Unlimited profile views",
            "Basic analytics",
            "Email support",
            "Custom branding",
            "Share links",
        ],
        accent_color: "#39C0C3",
        call_to_action: "Contact Sales",
        popular: false,
    },
    PlanTier {
        name: "Growth",
        price: PlanPrice::Monthly(499),
        description: "For growing teams that need more",
        technician_limit: Some(50),
        features: &[
            "Up to 50 technicians",
            "Unlimited profile views",
            "Advanced analytics",
            "Priority email support",
            "Custom branding",
            "Share links",
            "API access",
            "Custom domains",
        ],
        accent_color: "#0B2E51",
        call_to_action: "Upgrade",
        popular: true,
    },
    PlanTier {
        name: "Enterprise",
        price: PlanPrice::Custom,
        description: "For large organizations with custom needs",
        technician_limit: None,
        features: &[
            "Unlimited technicians",
            "Unlimited profile views",
            "Enterprise analytics",
            "Dedicated account manager",
            "Custom branding",
            "Share links",
            "API access",
            "Custom domains",
            "SSO integration",
            "White-label options",
            "SLA guarantee",
        ],
        accent_color: "#E0505F",
        call_to_action: "Contact Sales",
        popular: false,
    },
];

pub fn catalog() -> &'static [PlanTier] {
    &PLANS
}

pub fn find(name: &str) -> Option<&'static PlanTier> {
    PLANS
        .iter()
        .find(|plan| plan.name.eq_ignore_ascii_case(name.trim()))
}
