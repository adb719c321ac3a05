#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::compose::DirectPhrasing;
use crate::guard::GuardPolicy;

/// Handling for one-to-one message triggers, selected by
/// `fanout.direct_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectPolicy {
    /// Message text as title, no flag check, no flag writes.
    DirectNoGuard,
    /// Sender as title, both mirrored copies checked and flagged.
    DirectWithMirrorGuard,
}

impl DirectPolicy {
    pub fn guard(self) -> GuardPolicy {
        match self {
            Self::DirectNoGuard => GuardPolicy::Disabled,
            Self::DirectWithMirrorGuard => GuardPolicy::Mirrored,
        }
    }

    pub fn phrasing(self) -> DirectPhrasing {
        match self {
            Self::DirectNoGuard => DirectPhrasing::MessageAsTitle,
            Self::DirectWithMirrorGuard => DirectPhrasing::SenderAsTitle,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DirectNoGuard => "direct_no_guard",
            Self::DirectWithMirrorGuard => "direct_with_mirror_guard",
        }
    }
}

impl std::str::FromStr for DirectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "direct_no_guard" | "no_guard" => Ok(Self::DirectNoGuard),
            "direct_with_mirror_guard" | "mirror_guard" => Ok(Self::DirectWithMirrorGuard),
            other => Err(format!("unknown direct policy: {}", other)),
        }
    }
}
