use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" | "med" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority {other:?} (expected High/Medium/Low)")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub priority: Priority,
    pub timeline: String,
    pub expected_impact: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub executive_summary: String,
    pub key_findings: Vec<String>,
    pub strategic_recommendations: Vec<Recommendation>,
    pub risk_assessment: String,
    pub next_steps: Vec<String>,
}

/// Closed set of executive audiences a report can be tailored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutiveRole {
    Ceo,
    Cfo,
    Coo,
    Cto,
    Cmo,
    HeadOfSales,
    HeadOfProduct,
    VpMarketing,
    VpOperations,
    ChiefStrategyOfficer,
}

impl ExecutiveRole {
    pub const ALL: [ExecutiveRole; 10] = [
        ExecutiveRole::Ceo,
        ExecutiveRole::Cfo,
        ExecutiveRole::Coo,
        ExecutiveRole::Cto,
        ExecutiveRole::Cmo,
        ExecutiveRole::HeadOfSales,
        ExecutiveRole::HeadOfProduct,
        ExecutiveRole::VpMarketing,
        ExecutiveRole::VpOperations,
        ExecutiveRole::ChiefStrategyOfficer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExecutiveRole::Ceo => "CEO",
            ExecutiveRole::Cfo => "CFO",
            ExecutiveRole::Coo => "COO",
            ExecutiveRole::Cto => "CTO",
            ExecutiveRole::Cmo => "CMO",
            ExecutiveRole::HeadOfSales => "Head of Sales",
            ExecutiveRole::HeadOfProduct => "Head of Product",
            ExecutiveRole::VpMarketing => "VP Marketing",
            ExecutiveRole::VpOperations => "VP Operations",
            ExecutiveRole::ChiefStrategyOfficer => "Chief Strategy Officer",
        }
    }

    /// Audience description used in the system prompt.
    pub fn focus(self) -> &'static str {
        match self {
            ExecutiveRole::Ceo => {
                "chief executive officer focused on overall strategy, growth, and shareholder value"
            }
            ExecutiveRole::Cfo => {
                "chief financial officer focused on financial performance, profitability, and risk management"
            }
            ExecutiveRole::Coo => {
                "chief operating officer focused on operational efficiency, process optimization, and execution"
            }
            ExecutiveRole::Cto => {
                "chief technology officer focused on technology strategy, innovation, and digital transformation"
            }
            ExecutiveRole::Cmo => {
                "chief marketing officer focused on brand strategy, customer acquisition, and market positioning"
            }
            ExecutiveRole::HeadOfSales => {
                "sales leader focused on revenue growth, sales performance, and market expansion"
            }
            ExecutiveRole::HeadOfProduct => {
                "product leader focused on product strategy, development, and market fit"
            }
            ExecutiveRole::VpMarketing => {
                "marketing vice president focused on campaign performance, demand generation, and regional messaging"
            }
            ExecutiveRole::VpOperations => {
                "operations vice president focused on supply chain, fulfillment capacity, and regional execution"
            }
            ExecutiveRole::ChiefStrategyOfficer => {
                "chief strategy officer focused on portfolio direction, competitive positioning, and long-term bets"
            }
        }
    }
}

impl fmt::Display for ExecutiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExecutiveRole {
    type Err = String;

    /// Accepts labels case-insensitively, with spaces, `-` or `_` as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_role_key(s);
        ExecutiveRole::ALL
            .into_iter()
            .find(|role| normalize_role_key(role.label()) == key)
            .ok_or_else(|| {
                let known: Vec<&str> = ExecutiveRole::ALL.iter().map(|r| r.label()).collect();
                format!("unknown executive role {s:?} (expected one of: {})", known.join(", "))
            })
    }
}

fn normalize_role_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' | '_' => None,
            c => Some(c.to_ascii_lowercase()),
        })
        .collect()
}

impl Serialize for ExecutiveRole {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ExecutiveRole {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_labels_loosely() {
        assert_eq!("ceo".parse::<ExecutiveRole>().unwrap(), ExecutiveRole::Ceo);
        assert_eq!(
            "head-of-sales".parse::<ExecutiveRole>().unwrap(),
            ExecutiveRole::HeadOfSales
        );
        assert_eq!(
            " Chief Strategy Officer ".parse::<ExecutiveRole>().unwrap(),
            ExecutiveRole::ChiefStrategyOfficer
        );
        assert!("intern".parse::<ExecutiveRole>().is_err());
    }

    #[test]
    fn every_role_round_trips_through_its_label() {
        for role in ExecutiveRole::ALL {
            assert_eq!(role.label().parse::<ExecutiveRole>().unwrap(), role);
            assert!(!role.focus().is_empty());
        }
    }

    #[test]
    fn priority_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
