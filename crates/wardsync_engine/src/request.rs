//! Sync phases and requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One reconciliation unit for one entity type.
///
/// Variants are declared in canonical execution order, and `Ord` follows
/// declaration order: observations and orders reference patients and
/// concepts, so those are synced first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// User accounts.
    Users,
    /// Location tree and names.
    Locations,
    /// Chart layout.
    ChartItems,
    /// Concepts and names.
    Concepts,
    /// Patients.
    Patients,
    /// Observations (incremental).
    Observations,
    /// Orders.
    Orders,
    /// Forms.
    Forms,
}

impl Phase {
    /// Every phase in canonical order.
    pub const ALL: [Phase; 8] = [
        Phase::Users,
        Phase::Locations,
        Phase::ChartItems,
        Phase::Concepts,
        Phase::Patients,
        Phase::Observations,
        Phase::Orders,
        Phase::Forms,
    ];

    /// The phase's option-bundle name, e.g. `USERS`.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Users => "USERS",
            Phase::Locations => "LOCATIONS",
            Phase::ChartItems => "CHART_ITEMS",
            Phase::Concepts => "CONCEPTS",
            Phase::Patients => "PATIENTS",
            Phase::Observations => "OBSERVATIONS",
            Phase::Orders => "ORDERS",
            Phase::Forms => "FORMS",
        }
    }

    /// Parses an option-bundle name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Progress label shown while the phase runs.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Users => "Syncing users",
            Phase::Locations => "Syncing locations",
            Phase::ChartItems => "Syncing charts",
            Phase::Concepts => "Syncing concepts",
            Phase::Patients => "Syncing patients",
            Phase::Observations => "Syncing observations",
            Phase::Orders => "Syncing orders",
            Phase::Forms => "Syncing forms",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable request to sync some phases.
///
/// Requests compare by value, which is how periodic loops are keyed: two
/// requests built separately with the same phases are the same loop.
///
/// **An empty phase set means every phase.** A request with no phases, one
/// with `full_sync` set, or one naming every phase is a full sync, and a full
/// sync records its start and end times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRequest {
    phases: BTreeSet<Phase>,
    full_sync: bool,
}

impl SyncRequest {
    /// A request for every phase.
    pub fn full() -> Self {
        Self {
            phases: BTreeSet::new(),
            full_sync: true,
        }
    }

    /// A request for the given phases.
    pub fn phases(phases: impl IntoIterator<Item = Phase>) -> Self {
        Self {
            phases: phases.into_iter().collect(),
            full_sync: false,
        }
    }

    /// Parses a comma-separated list of phase names, e.g. `USERS,LOCATIONS`.
    ///
    /// Unrecognized names are logged and skipped.
    pub fn from_phase_names(names: &str) -> Self {
        let phases = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| {
                let phase = Phase::from_name(name);
                if phase.is_none() {
                    tracing::warn!(name, options = names, "unrecognized phase name");
                }
                phase
            });
        Self::phases(phases)
    }

    /// Renders the requested phases as a comma-separated list.
    pub fn phase_names(&self) -> String {
        self.phases
            .iter()
            .map(Phase::name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns true if this is a full sync.
    pub fn is_full_sync(&self) -> bool {
        self.full_sync || self.phases.is_empty() || self.phases.len() == Phase::ALL.len()
    }

    /// The phases to run, in canonical order.
    pub fn resolved_phases(&self) -> Vec<Phase> {
        if self.full_sync || self.phases.is_empty() {
            Phase::ALL.to_vec()
        } else {
            // BTreeSet iterates in `Ord` order, which is canonical order.
            self.phases.iter().copied().collect()
        }
    }
}

impl fmt::Display for SyncRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full_sync || self.phases.is_empty() {
            f.write_str("full sync")
        } else {
            write!(f, "phases {}", self.phase_names())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_order_ignores_request_order() {
        let request = SyncRequest::phases([Phase::Forms, Phase::Users, Phase::Observations]);
        assert_eq!(
            request.resolved_phases(),
            vec![Phase::Users, Phase::Observations, Phase::Forms]
        );
    }

    #[test]
    fn empty_request_means_all_phases() {
        let request = SyncRequest::phases([]);
        assert!(request.is_full_sync());
        assert_eq!(request.resolved_phases(), Phase::ALL.to_vec());
    }

    #[test]
    fn full_flag_overrides_subset() {
        let mut request = SyncRequest::phases([Phase::Users]);
        request.full_sync = true;
        assert!(request.is_full_sync());
        assert_eq!(request.resolved_phases().len(), Phase::ALL.len());
    }

    #[test]
    fn naming_every_phase_is_full() {
        assert!(SyncRequest::phases(Phase::ALL).is_full_sync());
        assert!(!SyncRequest::phases([Phase::Users, Phase::Forms]).is_full_sync());
    }

    #[test]
    fn parse_phase_names() {
        let request = SyncRequest::from_phase_names("OBSERVATIONS, USERS,BOGUS,,");
        assert_eq!(
            request.resolved_phases(),
            vec![Phase::Users, Phase::Observations]
        );
        assert_eq!(request.phase_names(), "USERS,OBSERVATIONS");
    }

    #[test]
    fn requests_compare_by_value() {
        let a = SyncRequest::phases([Phase::Patients, Phase::Orders]);
        let b = SyncRequest::phases([Phase::Orders, Phase::Patients]);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display() {
        assert_eq!(SyncRequest::full().to_string(), "full sync");
        assert_eq!(
            SyncRequest::phases([Phase::Orders]).to_string(),
            "phases ORDERS"
        );
    }
}
