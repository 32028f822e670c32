// Trip and activity CRUD against `/trips`

use crate::client::ApiClient;
use crate::envelope::ApiOutcome;
use crate::error::ApiError;
use crate::models::{Activity, ActivityDraft, Trip, TripDraft};

#[derive(Clone)]
pub struct TripService {
    client: ApiClient,
}

impl TripService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<ApiOutcome<Vec<Trip>>, ApiError> {
        self.client.get("/trips").await?.into_envelope()
    }

    pub async fn get(&self, id: &str) -> Result<ApiOutcome<Trip>, ApiError> {
        self.client
            .get(&format!("/trips/{}", id))
            .await?
            .into_envelope()
    }

    pub async fn create(&self, trip: &TripDraft) -> Result<ApiOutcome<Trip>, ApiError> {
        self.client.post("/trips", trip).await?.into_envelope()
    }

    pub async fn update(&self, id: &str, trip: &TripDraft) -> Result<ApiOutcome<Trip>, ApiError> {
        self.client
            .put(&format!("/trips/{}", id), trip)
            .await?
            .into_envelope()
    }

    pub async fn delete(&self, id: &str) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .delete(&format!("/trips/{}", id))
            .await?
            .into_envelope()
    }
}

#[derive(Clone)]
pub struct ActivityService {
    client: ApiClient,
}

impl ActivityService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, trip_id: &str) -> Result<ApiOutcome<Vec<Activity>>, ApiError> {
        self.client
            .get(&format!("/trips/{}/activities", trip_id))
            .await?
            .into_envelope()
    }

    pub async fn create(
        &self,
        trip_id: &str,
        activity: &ActivityDraft,
    ) -> Result<ApiOutcome<Activity>, ApiError> {
        self.client
            .post(&format!("/trips/{}/activities", trip_id), activity)
            .await?
            .into_envelope()
    }

    pub async fn update(
        &self,
        trip_id: &str,
        activity_id: &str,
        activity: &ActivityDraft,
    ) -> Result<ApiOutcome<Activity>, ApiError> {
        self.client
            .put(
                &format!("/trips/{}/activities/{}", trip_id, activity_id),
                activity,
            )
            .await?
            .into_envelope()
    }

    pub async fn delete(&self, trip_id: &str, activity_id: &str) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .delete(&format!("/trips/{}/activities/{}", trip_id, activity_id))
            .await?
            .into_envelope()
    }
}
