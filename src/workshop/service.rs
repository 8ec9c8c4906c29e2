//! Workshop service - directory CRUD with owner checks

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{ListWorkshopsQuery, Workshop, WorkshopError, WorkshopRequest};
use crate::models::{Actor, Role};
use crate::store::WorkshopStore;

pub struct WorkshopService {
    workshops: Arc<dyn WorkshopStore>,
}

impl WorkshopService {
    pub fn new(workshops: Arc<dyn WorkshopStore>) -> Self {
        Self { workshops }
    }

    pub async fn list(&self, query: &ListWorkshopsQuery) -> Result<Vec<Workshop>, WorkshopError> {
        let all = self.workshops.list().await?;
        Ok(match query.q.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                all.into_iter().filter(|w| w.matches(needle)).collect()
            }
            _ => all,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Workshop, WorkshopError> {
        self.workshops
            .get(id)
            .await?
            .ok_or(WorkshopError::NotFound(id))
    }

    /// Mechanics and admins may register a workshop
    pub async fn create(
        &self,
        actor: Actor,
        request: WorkshopRequest,
    ) -> Result<Workshop, WorkshopError> {
        if actor.role == Role::Customer {
            return Err(WorkshopError::Forbidden(
                "Only mechanics and admins can register workshops".to_string(),
            ));
        }
        validate(&request)?;

        let workshop = Workshop {
            id: Uuid::new_v4(),
            owner_id: actor.id,
            name: request.name.trim().to_string(),
            address: request.address.trim().to_string(),
            latitude: request.latitude,
            longitude: request.longitude,
            phone: request.phone,
            services: request.services,
            open_hours: request.open_hours,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.workshops.insert(&workshop).await?;

        tracing::info!(workshop = %workshop.id, owner = %actor.id, "Workshop registered");
        Ok(workshop)
    }

    pub async fn update(
        &self,
        id: Uuid,
        actor: Actor,
        request: WorkshopRequest,
    ) -> Result<Workshop, WorkshopError> {
        let current = self.owned(id, actor).await?;
        validate(&request)?;

        let workshop = Workshop {
            name: request.name.trim().to_string(),
            address: request.address.trim().to_string(),
            latitude: request.latitude,
            longitude: request.longitude,
            phone: request.phone,
            services: request.services,
            open_hours: request.open_hours,
            updated_at: Some(Utc::now()),
            ..current
        };

        if !self.workshops.update(&workshop).await? {
            return Err(WorkshopError::NotFound(id));
        }
        Ok(workshop)
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), WorkshopError> {
        self.owned(id, actor).await?;
        if !self.workshops.delete(id).await? {
            return Err(WorkshopError::NotFound(id));
        }
        tracing::info!(workshop = %id, by = %actor.id, "Workshop deleted");
        Ok(())
    }

    async fn owned(&self, id: Uuid, actor: Actor) -> Result<Workshop, WorkshopError> {
        let workshop = self.get(id).await?;
        if workshop.owner_id != actor.id && !actor.is_admin() {
            return Err(WorkshopError::Forbidden(
                "Only the owner can change this workshop".to_string(),
            ));
        }
        Ok(workshop)
    }
}

fn validate(request: &WorkshopRequest) -> Result<(), WorkshopError> {
    let mut errors = match request.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };
    if request.name.trim().is_empty() {
        errors.add("name", ValidationError::new("required"));
    }
    if request.address.trim().is_empty() {
        errors.add("address", ValidationError::new("required"));
    }
    if !(-90.0..=90.0).contains(&request.latitude) {
        errors.add("latitude", ValidationError::new("range"));
    }
    if !(-180.0..=180.0).contains(&request.longitude) {
        errors.add("longitude", ValidationError::new("range"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkshopError::Invalid(errors))
    }
}
