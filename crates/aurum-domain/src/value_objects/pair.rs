#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSpec {
    pub lead: String,
    pub lag: String,
}

impl PairSpec {
    pub fn new(lead: impl Into<String>, lag: impl Into<String>) -> Self {
        Self {
            lead: lead.into(),
            lag: lag.into(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.lead == symbol || self.lag == symbol
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.lead, self.lag)
    }
}
