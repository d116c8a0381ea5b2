//! Tiered autonomy: what each actor tier may do with an approved proposal.
//!
//! - Tier 0: propose-only — proposals are evaluated but never executed.
//! - Tier 1: sandbox execution — approved actions run in the Blast Box.
//! - Tier 2: canary + attestations — reserved, execution refused.
//! - Tier 3: production execution with mandatory human sign-off.
//!
//! Tiers are assigned in the identity allow-list and are never elevated at
//! runtime.

/// The capability envelope of one autonomy tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub tier: u8,
    pub can_execute: bool,
    pub requires_sandbox: bool,
    pub requires_human_approval: bool,
    pub description: &'static str,
}

/// All known tiers, indexed by tier number.
pub const TIER_POLICIES: [TierPolicy; 4] = [
    TierPolicy {
        tier: 0,
        can_execute: false,
        requires_sandbox: false,
        requires_human_approval: false,
        description: "propose-only: execution not permitted",
    },
    TierPolicy {
        tier: 1,
        can_execute: true,
        requires_sandbox: true,
        requires_human_approval: false,
        description: "sandbox execution: Blast Box only",
    },
    TierPolicy {
        tier: 2,
        can_execute: false,
        requires_sandbox: true,
        requires_human_approval: false,
        description: "canary + attestations: not yet implemented",
    },
    TierPolicy {
        tier: 3,
        can_execute: true,
        requires_sandbox: false,
        requires_human_approval: true,
        description: "production execution with human approval",
    },
];

/// Look up the policy for a tier number.
pub fn policy_for(tier: u8) -> Option<&'static TierPolicy> {
    TIER_POLICIES.get(tier as usize)
}
