use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::MetricSpec;
use crate::ValidationError;

/// The fixed analysis scenarios offered on the analysis page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStudy {
    MarketExpansion,
    InsuranceTransactions,
    TransactionDynamics,
    UserRegistration,
    InsuranceEngagement,
}

/// Table and columns a case study analyzes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableBinding {
    pub table: &'static str,
    pub metrics: MetricSpec,
}

impl CaseStudy {
    pub const ALL: [Self; 5] = [
        Self::MarketExpansion,
        Self::InsuranceTransactions,
        Self::TransactionDynamics,
        Self::UserRegistration,
        Self::InsuranceEngagement,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            Self::MarketExpansion => "market-expansion",
            Self::InsuranceTransactions => "insurance-transactions",
            Self::TransactionDynamics => "transaction-dynamics",
            Self::UserRegistration => "user-registration",
            Self::InsuranceEngagement => "insurance-engagement",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::MarketExpansion => "Transaction Analysis for Market Expansion",
            Self::InsuranceTransactions => "Insurance Transactions Analysis",
            Self::TransactionDynamics => "Decoding Transaction Dynamics on PhonePe",
            Self::UserRegistration => "User Registration Analysis",
            Self::InsuranceEngagement => "Insurance Engagement Analysis",
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            Self::MarketExpansion | Self::TransactionDynamics => "agg_trans",
            Self::InsuranceTransactions | Self::InsuranceEngagement => "agg_insur",
            Self::UserRegistration => "map_user",
        }
    }

    /// Table, category column and metrics of this case study.
    pub fn binding(self) -> TableBinding {
        let metrics = match self {
            Self::MarketExpansion | Self::TransactionDynamics => {
                MetricSpec::new("transaction_type", "transaction_count", "transaction_amount")
            }
            Self::InsuranceTransactions | Self::InsuranceEngagement => {
                MetricSpec::new("state", "insurance_count", "insurance_amount")
            }
            Self::UserRegistration => MetricSpec::new("district", "registered_users", "app_opens"),
        };

        TableBinding {
            table: self.table(),
            metrics,
        }
    }
}

impl Display for CaseStudy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CaseStudy {
    type Err = ValidationError;

    /// Accepts the slug or the full title, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|case| {
                case.slug().eq_ignore_ascii_case(wanted) || case.title().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ValidationError::UnknownCaseStudy {
                value: wanted.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip() {
        for case in CaseStudy::ALL {
            assert_eq!(case.slug().parse::<CaseStudy>(), Ok(case));
            assert_eq!(case.title().to_uppercase().parse::<CaseStudy>(), Ok(case));
        }
    }

    #[test]
    fn unknown_case_study_is_rejected() {
        let error = "churn".parse::<CaseStudy>().expect_err("must fail");
        assert!(matches!(error, ValidationError::UnknownCaseStudy { ref value } if value == "churn"));
    }

    #[test]
    fn bindings_follow_the_scenario_table() {
        let binding = CaseStudy::UserRegistration.binding();
        assert_eq!(binding.table, "map_user");
        assert_eq!(binding.metrics.category_column, "district");
        assert_eq!(binding.metrics.amount_metric, "app_opens");

        assert_eq!(
            CaseStudy::MarketExpansion.binding(),
            CaseStudy::TransactionDynamics.binding()
        );
        assert_eq!(CaseStudy::InsuranceEngagement.binding().metrics.category_column, "state");
    }
}
