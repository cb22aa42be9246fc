//! Test fixtures: a sample ward and an engine harness.
//!
//! The harness wires a [`SyncEngine`] to a [`MemoryStore`], a
//! [`MemoryRemote`], a [`StatusRecorder`], and a [`HealthFlag`], keeping a
//! handle on each so tests can inspect or perturb them.

use crate::recording::StatusRecorder;
use std::collections::BTreeMap;
use std::sync::Arc;
use wardsync_engine::{SyncConfig, SyncEngine, SyncOutcome, SyncReport, SyncRequest};
use wardsync_engine::HealthFlag;
use wardsync_protocol::{
    ChartSection, MemoryRemote, RemoteChart, RemoteConcept, RemoteEncounter, RemoteForm,
    RemoteLocation, RemoteOrder, RemotePatient, RemotePatientRecord, RemoteSnapshot, RemoteUser,
};
use wardsync_store::MemoryStore;

fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(locale, name)| ((*locale).to_owned(), (*name).to_owned()))
        .collect()
}

/// Builds a patient with the fields most tests care about.
pub fn patient(uuid: &str, given_name: &str, family_name: &str) -> RemotePatient {
    RemotePatient {
        uuid: uuid.to_owned(),
        id: None,
        given_name: Some(given_name.to_owned()),
        family_name: Some(family_name.to_owned()),
        sex: None,
        birthdate: None,
        location_uuid: None,
    }
}

/// A small but complete ward: two users, a location tree, concepts, one
/// chart, three patients with encounters, orders, and a form.
pub fn ward_snapshot() -> RemoteSnapshot {
    RemoteSnapshot {
        users: vec![
            RemoteUser {
                uuid: "user-ana".into(),
                full_name: "Ana Nurse".into(),
            },
            RemoteUser {
                uuid: "user-bo".into(),
                full_name: "Bo Clinician".into(),
            },
        ],
        locations: vec![
            RemoteLocation {
                uuid: "loc-site".into(),
                parent_uuid: None,
                names: names(&[("en", "Treatment Centre"), ("fr", "Centre de traitement")]),
            },
            RemoteLocation {
                uuid: "loc-triage".into(),
                parent_uuid: Some("loc-site".into()),
                names: names(&[("en", "Triage")]),
            },
            RemoteLocation {
                uuid: "loc-confirmed".into(),
                parent_uuid: Some("loc-site".into()),
                names: names(&[("en", "Confirmed"), ("fr", "Confirmé")]),
            },
        ],
        concepts: vec![
            RemoteConcept {
                uuid: "concept-temp".into(),
                xform_id: 5088,
                concept_type: "numeric".into(),
                names: names(&[("en", "Temperature")]),
            },
            RemoteConcept {
                uuid: "concept-pulse".into(),
                xform_id: 5087,
                concept_type: "numeric".into(),
                names: names(&[("en", "Pulse"), ("fr", "Pouls")]),
            },
        ],
        charts: vec![RemoteChart {
            uuid: "chart-main".into(),
            sections: vec![ChartSection {
                uuid: Some("section-vitals".into()),
                concept_uuids: vec!["concept-temp".into(), "concept-pulse".into()],
            }],
        }],
        patients: vec![
            RemotePatient {
                location_uuid: Some("loc-triage".into()),
                sex: Some("F".into()),
                ..patient("pat-1", "Jane", "Doe")
            },
            patient("pat-2", "Bob", "Roe"),
            patient("pat-3", "Chi", "Moe"),
        ],
        patient_records: vec![
            RemotePatientRecord {
                patient_uuid: "pat-1".into(),
                encounters: vec![RemoteEncounter {
                    uuid: Some("enc-1".into()),
                    timestamp_millis: Some(1_420_070_400_000),
                    observations: names(&[("concept-temp", "38.5"), ("concept-pulse", "92")]),
                    order_uuids: vec!["order-1".into()],
                }],
            },
            RemotePatientRecord {
                patient_uuid: "pat-2".into(),
                encounters: vec![RemoteEncounter {
                    uuid: Some("enc-2".into()),
                    timestamp_millis: Some(1_420_074_000_000),
                    observations: names(&[("concept-temp", "37.0")]),
                    order_uuids: Vec::new(),
                }],
            },
        ],
        orders: vec![RemoteOrder {
            uuid: "order-1".into(),
            patient_uuid: "pat-1".into(),
            instructions: "Paracetamol 1g".into(),
            start_millis: 1_420_070_400_000,
            stop_millis: None,
        }],
        forms: vec![RemoteForm {
            uuid: "form-vitals".into(),
            name: "Vital signs".into(),
            version: "3".into(),
        }],
    }
}

/// An engine wired to in-memory collaborators.
pub struct TestHarness {
    /// The local store.
    pub store: Arc<MemoryStore>,
    /// The remote source.
    pub remote: Arc<MemoryRemote>,
    /// Every status the engine broadcast.
    pub statuses: Arc<StatusRecorder>,
    /// The health flag the engine checks.
    pub health: Arc<HealthFlag>,
    /// The engine under test.
    pub engine: Arc<SyncEngine>,
}

impl TestHarness {
    /// Creates a harness with an empty store and default configuration.
    pub fn new(snapshot: RemoteSnapshot) -> Self {
        Self::with_store(snapshot, MemoryStore::new(), SyncConfig::default())
    }

    /// Creates a harness around an existing store.
    pub fn with_store(snapshot: RemoteSnapshot, store: MemoryStore, config: SyncConfig) -> Self {
        let store = Arc::new(store);
        let remote = Arc::new(MemoryRemote::new(snapshot));
        let statuses = Arc::new(StatusRecorder::new());
        let health = Arc::new(HealthFlag::new());
        let engine = Arc::new(
            SyncEngine::new(store.clone(), remote.clone(), statuses.clone())
                .with_health(health.clone())
                .with_config(config),
        );
        Self {
            store,
            remote,
            statuses,
            health,
            engine,
        }
    }

    /// Runs one sync with a fresh report.
    pub fn sync(&self, request: &SyncRequest) -> (SyncOutcome, SyncReport) {
        let mut report = SyncReport::new();
        let outcome = self.engine.sync(request, &mut report);
        (outcome, report)
    }
}
