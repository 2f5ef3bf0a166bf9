#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    Long,
    Short,
    #[default]
    Flat,
}

impl PositionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionState::Long => "LONG",
            PositionState::Short => "SHORT",
            PositionState::Flat => "FLAT",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.to_uppercase().as_str() {
            "LONG" => Ok(PositionState::Long),
            "SHORT" => Ok(PositionState::Short),
            "FLAT" => Ok(PositionState::Flat),
            _ => Err(format!("unsupported position state: {}", value)),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, PositionState::Flat)
    }
}

#[cfg(test)]
mod tests {
    use super::PositionState;

    #[test]
    fn parse_round_trips() {
        for state in [PositionState::Long, PositionState::Short, PositionState::Flat] {
            assert_eq!(PositionState::parse(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(PositionState::parse("SIDEWAYS").is_err());
    }
}
