//! Remote data source abstraction.

use crate::error::RemoteResult;
use crate::model::{
    ObservationPage, RemoteChart, RemoteConcept, RemoteForm, RemoteLocation, RemoteOrder,
    RemotePatient, RemoteUser,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// `/users`
    Users,
    /// `/locations`
    Locations,
    /// `/concepts`
    Concepts,
    /// `/charts`
    Charts,
    /// `/patients`
    Patients,
    /// `/observations`
    Observations,
    /// `/orders`
    Orders,
    /// `/forms`
    Forms,
}

impl Resource {
    /// The resource's path segment.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Locations => "locations",
            Resource::Concepts => "concepts",
            Resource::Charts => "charts",
            Resource::Patients => "patients",
            Resource::Observations => "observations",
            Resource::Orders => "orders",
            Resource::Forms => "forms",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A source of truth for remote records.
///
/// Every `list_*` call returns the complete current remote set for its
/// resource; no pagination is modeled except for the observation feed, which
/// is incremental by token.
///
/// Calls block until the data is available. Implementations must be
/// `Send + Sync` so the engine can run on a worker thread.
pub trait RemoteSource: Send + Sync {
    /// Lists all users.
    fn list_users(&self) -> RemoteResult<Vec<RemoteUser>>;

    /// Lists all locations.
    fn list_locations(&self) -> RemoteResult<Vec<RemoteLocation>>;

    /// Lists all concepts.
    fn list_concepts(&self) -> RemoteResult<Vec<RemoteConcept>>;

    /// Lists all chart layouts.
    fn list_charts(&self) -> RemoteResult<Vec<RemoteChart>>;

    /// Lists all patients.
    fn list_patients(&self) -> RemoteResult<Vec<RemotePatient>>;

    /// Fetches observations recorded after `since`.
    ///
    /// `None` starts from the beginning of the feed.
    fn list_observations(&self, since: Option<&str>) -> RemoteResult<ObservationPage>;

    /// Lists all orders.
    fn list_orders(&self) -> RemoteResult<Vec<RemoteOrder>>;

    /// Lists all forms.
    fn list_forms(&self) -> RemoteResult<Vec<RemoteForm>>;
}
