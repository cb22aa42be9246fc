//! Snapshot-backed remote source.

use crate::error::{RemoteError, RemoteResult};
use crate::model::{
    ObservationPage, RemoteChart, RemoteConcept, RemoteEncounter, RemoteForm, RemoteLocation,
    RemoteOrder, RemotePatient, RemotePatientRecord, RemoteUser,
};
use crate::remote::{RemoteSource, Resource};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default number of encounters per observation page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Prefix of the observation feed tokens handed out by [`MemoryRemote`].
const TOKEN_PREFIX: &str = "seq:";

/// Everything a [`MemoryRemote`] serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSnapshot {
    /// Users.
    pub users: Vec<RemoteUser>,
    /// Locations.
    pub locations: Vec<RemoteLocation>,
    /// Concepts.
    pub concepts: Vec<RemoteConcept>,
    /// Chart layouts.
    pub charts: Vec<RemoteChart>,
    /// Patients.
    pub patients: Vec<RemotePatient>,
    /// Encounters per patient, in feed order.
    pub patient_records: Vec<RemotePatientRecord>,
    /// Orders.
    pub orders: Vec<RemoteOrder>,
    /// Forms.
    pub forms: Vec<RemoteForm>,
}

/// An in-memory [`RemoteSource`].
///
/// Serves a [`RemoteSnapshot`] and records every call. Individual resources
/// can be made to fail, which lets tests abort a sync mid-way.
///
/// The observation feed is served in pages of encounters; the token is the
/// number of encounters already delivered.
#[derive(Debug)]
pub struct MemoryRemote {
    snapshot: RwLock<RemoteSnapshot>,
    failures: RwLock<HashMap<Resource, String>>,
    calls: RwLock<Vec<Resource>>,
    page_size: usize,
}

impl MemoryRemote {
    /// Creates a remote serving `snapshot`.
    pub fn new(snapshot: RemoteSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            failures: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Parses a JSON [`RemoteSnapshot`].
    pub fn from_json(json: &str) -> RemoteResult<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Sets the number of encounters per observation page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Mutates the served snapshot.
    pub fn update(&self, f: impl FnOnce(&mut RemoteSnapshot)) {
        f(&mut self.snapshot.write());
    }

    /// Makes every call for `resource` fail with `message`.
    pub fn fail(&self, resource: Resource, message: impl Into<String>) {
        self.failures.write().insert(resource, message.into());
    }

    /// Stops failing calls for `resource`.
    pub fn heal(&self, resource: Resource) {
        self.failures.write().remove(&resource);
    }

    /// Resources fetched so far, in call order.
    pub fn calls(&self) -> Vec<Resource> {
        self.calls.read().clone()
    }

    fn begin(&self, resource: Resource) -> RemoteResult<()> {
        self.calls.write().push(resource);
        match self.failures.read().get(&resource) {
            Some(message) => {
                tracing::debug!(%resource, "injected remote failure");
                Err(RemoteError::Unreachable(message.clone()))
            }
            None => Ok(()),
        }
    }

    fn list<T: Clone>(
        &self,
        resource: Resource,
        pick: impl FnOnce(&RemoteSnapshot) -> &Vec<T>,
    ) -> RemoteResult<Vec<T>> {
        self.begin(resource)?;
        Ok(pick(&self.snapshot.read()).clone())
    }
}

fn parse_token(since: Option<&str>) -> RemoteResult<usize> {
    let Some(token) = since else {
        return Ok(0);
    };
    token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RemoteError::Malformed(format!("unknown sync token {token:?}")))
}

impl RemoteSource for MemoryRemote {
    fn list_users(&self) -> RemoteResult<Vec<RemoteUser>> {
        self.list(Resource::Users, |s| &s.users)
    }

    fn list_locations(&self) -> RemoteResult<Vec<RemoteLocation>> {
        self.list(Resource::Locations, |s| &s.locations)
    }

    fn list_concepts(&self) -> RemoteResult<Vec<RemoteConcept>> {
        self.list(Resource::Concepts, |s| &s.concepts)
    }

    fn list_charts(&self) -> RemoteResult<Vec<RemoteChart>> {
        self.list(Resource::Charts, |s| &s.charts)
    }

    fn list_patients(&self) -> RemoteResult<Vec<RemotePatient>> {
        self.list(Resource::Patients, |s| &s.patients)
    }

    fn list_observations(&self, since: Option<&str>) -> RemoteResult<ObservationPage> {
        self.begin(Resource::Observations)?;
        let offset = parse_token(since)?;

        let snapshot = self.snapshot.read();
        let feed: Vec<(&str, &RemoteEncounter)> = snapshot
            .patient_records
            .iter()
            .flat_map(|record| {
                record
                    .encounters
                    .iter()
                    .map(move |e| (record.patient_uuid.as_str(), e))
            })
            .collect();

        let start = offset.min(feed.len());
        let end = (start + self.page_size).min(feed.len());

        let mut records: Vec<RemotePatientRecord> = Vec::new();
        for (patient_uuid, encounter) in &feed[start..end] {
            match records.last_mut() {
                Some(last) if last.patient_uuid == *patient_uuid => {
                    last.encounters.push((*encounter).clone());
                }
                _ => records.push(RemotePatientRecord {
                    patient_uuid: (*patient_uuid).to_owned(),
                    encounters: vec![(*encounter).clone()],
                }),
            }
        }

        Ok(ObservationPage {
            records,
            sync_token: format!("{TOKEN_PREFIX}{end}"),
            more: end < feed.len(),
        })
    }

    fn list_orders(&self) -> RemoteResult<Vec<RemoteOrder>> {
        self.list(Resource::Orders, |s| &s.orders)
    }

    fn list_forms(&self) -> RemoteResult<Vec<RemoteForm>> {
        self.list(Resource::Forms, |s| &s.forms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encounter(uuid: &str) -> RemoteEncounter {
        RemoteEncounter {
            uuid: Some(uuid.into()),
            timestamp_millis: Some(1_000),
            observations: [("c1".to_string(), "37.5".to_string())].into(),
            order_uuids: Vec::new(),
        }
    }

    fn feed_remote() -> MemoryRemote {
        MemoryRemote::new(RemoteSnapshot {
            patient_records: vec![
                RemotePatientRecord {
                    patient_uuid: "p1".into(),
                    encounters: vec![encounter("e1"), encounter("e2")],
                },
                RemotePatientRecord {
                    patient_uuid: "p2".into(),
                    encounters: vec![encounter("e3")],
                },
            ],
            ..RemoteSnapshot::default()
        })
    }

    #[test]
    fn lists_snapshot_and_records_calls() {
        let remote = MemoryRemote::new(RemoteSnapshot {
            users: vec![RemoteUser {
                uuid: "u1".into(),
                full_name: "Jane".into(),
            }],
            ..RemoteSnapshot::default()
        });
        assert_eq!(remote.list_users().unwrap().len(), 1);
        assert!(remote.list_forms().unwrap().is_empty());
        assert_eq!(remote.calls(), vec![Resource::Users, Resource::Forms]);
    }

    #[test]
    fn injected_failure_and_heal() {
        let remote = MemoryRemote::new(RemoteSnapshot::default());
        remote.fail(Resource::Patients, "connection reset");
        assert!(matches!(
            remote.list_patients(),
            Err(RemoteError::Unreachable(_))
        ));
        remote.heal(Resource::Patients);
        assert!(remote.list_patients().is_ok());
    }

    #[test]
    fn observation_feed_pages() {
        let remote = feed_remote().with_page_size(2);

        let first = remote.list_observations(None).unwrap();
        assert!(first.more);
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.records[0].encounters.len(), 2);

        let second = remote.list_observations(Some(&first.sync_token)).unwrap();
        assert!(!second.more);
        assert_eq!(second.records[0].patient_uuid, "p2");

        let empty = remote.list_observations(Some(&second.sync_token)).unwrap();
        assert!(empty.records.is_empty());
        assert!(!empty.more);
        assert_eq!(empty.sync_token, second.sync_token);
    }

    #[test]
    fn bad_token_is_malformed() {
        let remote = feed_remote();
        assert!(matches!(
            remote.list_observations(Some("garbage")),
            Err(RemoteError::Malformed(_))
        ));
    }

    #[test]
    fn snapshot_from_json() {
        let remote = MemoryRemote::from_json(
            r#"{"forms":[{"uuid":"f1","name":"Admission","version":"3"}]}"#,
        )
        .unwrap();
        assert_eq!(remote.list_forms().unwrap()[0].name, "Admission");
        assert!(MemoryRemote::from_json("{not json").is_err());
    }
}
