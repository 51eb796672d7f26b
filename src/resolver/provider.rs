//! Target-compatibility resolution of capability providers.
//!
//! Given a search scope, a capability and a target, every candidate that is
//! compatible with the target and provides the capability is graded; the
//! highest grade wins. Ties resolve by candidate name, so the result never
//! depends on the iteration order of the scope.
//!
//! Bindings are computed on demand and never cached: the same capability can
//! bind to different providers in different scopes.

use std::cmp::Ordering;

use crate::core::{Module, Target};

/// Something that can be chosen as a capability provider.
pub trait ProviderCandidate {
    /// Stable name used for tie-breaking.
    fn candidate_name(&self) -> &str;

    /// Yes/no compatibility with a target.
    fn is_compatible(&self, target: &Target) -> bool;

    /// How specifically the candidate matches a target; higher is better.
    fn grade_target_match(&self, target: &Target) -> i32;

    /// Whether the candidate implements a capability.
    fn provides(&self, capability: &str) -> bool;
}

impl ProviderCandidate for Module {
    fn candidate_name(&self) -> &str {
        self.name()
    }

    fn is_compatible(&self, target: &Target) -> bool {
        Module::is_compatible(self, target)
    }

    fn grade_target_match(&self, target: &Target) -> i32 {
        Module::grade_target_match(self, target)
    }

    fn provides(&self, capability: &str) -> bool {
        Module::provides(self, capability)
    }
}

/// A qualifying candidate and its grade.
#[derive(Debug, Clone, Copy)]
pub struct RankedProvider<'a, C> {
    pub candidate: &'a C,
    pub grade: i32,
}

/// Every qualifying candidate, best first.
pub fn rank_providers<'a, C, I>(scope: I, capability: &str, target: &Target) -> Vec<RankedProvider<'a, C>>
where
    C: ProviderCandidate + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut ranked: Vec<_> = scope
        .into_iter()
        .filter(|c| c.is_compatible(target) && c.provides(capability))
        .map(|candidate| RankedProvider {
            candidate,
            grade: candidate.grade_target_match(target),
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

/// Every qualifying candidate, best first.
pub fn find_providers<'a, C, I>(scope: I, capability: &str, target: &Target) -> Vec<&'a C>
where
    C: ProviderCandidate + 'a,
    I: IntoIterator<Item = &'a C>,
{
    rank_providers(scope, capability, target)
        .into_iter()
        .map(|r| r.candidate)
        .collect()
}

/// The best qualifying candidate, or `None` when nothing qualifies.
pub fn find_best<'a, C, I>(scope: I, capability: &str, target: &Target) -> Option<&'a C>
where
    C: ProviderCandidate + 'a,
    I: IntoIterator<Item = &'a C>,
{
    scope
        .into_iter()
        .filter(|c| c.is_compatible(target) && c.provides(capability))
        .map(|candidate| RankedProvider {
            candidate,
            grade: candidate.grade_target_match(target),
        })
        .min_by(compare_ranked)
        .map(|r| r.candidate)
}

/// Higher grade first, then name ascending.
fn compare_ranked<C: ProviderCandidate>(a: &RankedProvider<'_, C>, b: &RankedProvider<'_, C>) -> Ordering {
    b.grade
        .cmp(&a.grade)
        .then_with(|| a.candidate.candidate_name().cmp(b.candidate.candidate_name()))
}
