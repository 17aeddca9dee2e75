//! Caller context for exposed-function dispatch.

use tessera_types::Relation;

/// Who is invoking an exposed function.
///
/// Each exposure is registered either without a relation (public) or
/// scoped to one relation. The caller context decides which registrants
/// take part in a call:
///
/// | Caller | Relation-less registrants | Scoped to `r` | Scoped elsewhere |
/// |--------|---------------------------|---------------|------------------|
/// | `Broadcast` | yes | yes | yes |
/// | `Public` | yes | no | no |
/// | `Scoped(r)` | yes | yes | no |
///
/// # Example
///
/// ```
/// use tessera_event::Caller;
/// use tessera_types::Relation;
///
/// let guild = Relation::new(1_u64);
/// let other = Relation::new(2_u64);
///
/// assert!(Caller::Broadcast.admits(Some(&other)));
/// assert!(Caller::Public.admits(None));
/// assert!(!Caller::Public.admits(Some(&guild)));
/// assert!(Caller::Scoped(guild.clone()).admits(Some(&guild)));
/// assert!(!Caller::Scoped(guild).admits(Some(&other)));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Caller {
    /// Runtime-internal or unbound call: every registrant.
    #[default]
    Broadcast,
    /// Only relation-less registrants.
    Public,
    /// Relation-less registrants plus those scoped to this relation.
    Scoped(Relation),
}

impl Caller {
    /// Returns whether a registrant with `relation` takes part.
    #[must_use]
    pub fn admits(&self, relation: Option<&Relation>) -> bool {
        match (self, relation) {
            (_, None) => true,
            (Self::Broadcast, Some(_)) => true,
            (Self::Public, Some(_)) => false,
            (Self::Scoped(caller), Some(own)) => caller.ptr_eq(own),
        }
    }
}

impl From<Option<Relation>> for Caller {
    fn from(relation: Option<Relation>) -> Self {
        match relation {
            Some(relation) => Self::Scoped(relation),
            None => Self::Public,
        }
    }
}
