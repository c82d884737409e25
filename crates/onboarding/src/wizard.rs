use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    OrganizationDetails,
    Quantity,
    LogoDesign,
    DistributionInfo,
    Confirmation,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::OrganizationDetails;
    pub const LAST: WizardStep = WizardStep::Confirmation;

    /// One-based position shown in the progress header.
    pub fn number(self) -> u8 {
        match self {
            Self::OrganizationDetails => 1,
            Self::Quantity => 2,
            Self::LogoDesign => 3,
            Self::DistributionInfo => 4,
            Self::Confirmation => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::OrganizationDetails),
            2 => Some(Self::Quantity),
            3 => Some(Self::LogoDesign),
            4 => Some(Self::DistributionInfo),
            5 => Some(Self::Confirmation),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::OrganizationDetails => "Organization Details",
            Self::Quantity => "Quantity",
            Self::LogoDesign => "Logo & Design",
            Self::DistributionInfo => "Distribution Info",
            Self::Confirmation => "Confirmation",
        }
    }

    fn succ(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    fn pred(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }
}

/// Linear step machine. Moves one step at a time and clamps at both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSequencer {
    current: WizardStep,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    /// Returns false when already on the last step.
    pub fn next(&mut self) -> bool {
        match self.current.succ() {
            Some(step) => {
                self.current = step;
                true
            }
            None => false,
        }
    }

    /// Returns false when already on the first step.
    pub fn back(&mut self) -> bool {
        match self.current.pred() {
            Some(step) => {
                self.current = step;
                true
            }
            None => false,
        }
    }

    pub fn can_submit(&self) -> bool {
        self.current == WizardStep::LAST
    }
}
