use serde::{Deserialize, Serialize};

/// First bitset of per-user help flags (dismissed hints, onboarding steps)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HelpFlags1(pub u64);

impl HelpFlags1 {
    pub const GETTING_STARTED_PANEL_DISMISSED: HelpFlags1 = HelpFlags1(1);

    /// True when every bit of `flag` is set
    pub fn has_flag(self, flag: HelpFlags1) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn add_flag(&mut self, flag: HelpFlags1) {
        self.0 |= flag.0;
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

impl From<u64> for HelpFlags1 {
    fn from(bits: u64) -> Self {
        HelpFlags1(bits)
    }
}
