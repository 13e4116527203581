use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{TransportModel, TransportTypeFilter},
    repository::{
        DeleteTransportResult, TransportFilter, TransportRepository, UpdateTransportResult,
    },
    types::{AdminTransportRequest, TransportRequest, TransportResponse},
};
use crate::account::{models::UserModel, repository::UserRepository};
use crate::shared::{AppError, Pagination};

/// Service for transport registration and management
pub struct TransportService {
    repository: Arc<dyn TransportRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl TransportService {
    pub fn new(
        repository: Arc<dyn TransportRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            user_repository,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_transport(&self, transport_id: Uuid) -> Result<TransportResponse, AppError> {
        Ok(self.find_transport(transport_id).await?.into())
    }

    /// Transports owned by the caller
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn list_owned(
        &self,
        owner: &UserModel,
        transport_type: TransportTypeFilter,
        page: Pagination,
    ) -> Result<Vec<TransportResponse>, AppError> {
        let filter = TransportFilter {
            owner_id: Some(owner.id),
            transport_type: transport_type.transport_type(),
        };
        self.list(filter, page).await
    }

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        transport_type: TransportTypeFilter,
        page: Pagination,
    ) -> Result<Vec<TransportResponse>, AppError> {
        let filter = TransportFilter {
            owner_id: None,
            transport_type: transport_type.transport_type(),
        };
        self.list(filter, page).await
    }

    async fn list(
        &self,
        filter: TransportFilter,
        page: Pagination,
    ) -> Result<Vec<TransportResponse>, AppError> {
        let transports = self
            .repository
            .list_transports(filter, page.validated()?)
            .await?;

        debug!(transport_count = transports.len(), "Transports listed");
        Ok(transports.into_iter().map(TransportResponse::from).collect())
    }

    /// Registers a transport owned by the caller
    #[instrument(skip(self, owner, request), fields(owner_id = %owner.id))]
    pub async fn create_transport(
        &self,
        owner: &UserModel,
        request: TransportRequest,
    ) -> Result<TransportResponse, AppError> {
        self.create(owner.id, request).await
    }

    /// Registers a transport on behalf of any existing user
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id))]
    pub async fn admin_create_transport(
        &self,
        request: AdminTransportRequest,
    ) -> Result<TransportResponse, AppError> {
        self.find_owner(request.owner_id).await?;
        self.create(request.owner_id, request.transport).await
    }

    async fn create(
        &self,
        owner_id: Uuid,
        request: TransportRequest,
    ) -> Result<TransportResponse, AppError> {
        validate(&request)?;

        let mut transport = TransportModel::new(
            owner_id,
            request.transport_type,
            request.model.trim(),
            request.color.trim(),
            request.identifier.trim(),
        );
        apply(&mut transport, request);
        self.repository.create_transport(&transport).await?;

        info!(transport_id = %transport.id, owner_id = %owner_id, "Transport created");
        Ok(transport.into())
    }

    /// Replaces a transport the caller owns
    #[instrument(skip(self, owner, request), fields(owner_id = %owner.id))]
    pub async fn update_transport(
        &self,
        owner: &UserModel,
        transport_id: Uuid,
        request: TransportRequest,
    ) -> Result<TransportResponse, AppError> {
        let transport = self.find_transport(transport_id).await?;
        ensure_owner(owner, &transport)?;

        let owner_id = transport.owner_id;
        self.replace(transport, owner_id, request).await
    }

    #[instrument(skip(self, request), fields(owner_id = %request.owner_id))]
    pub async fn admin_update_transport(
        &self,
        transport_id: Uuid,
        request: AdminTransportRequest,
    ) -> Result<TransportResponse, AppError> {
        let transport = self.find_transport(transport_id).await?;
        self.find_owner(request.owner_id).await?;

        self.replace(transport, request.owner_id, request.transport)
            .await
    }

    async fn replace(
        &self,
        mut transport: TransportModel,
        owner_id: Uuid,
        request: TransportRequest,
    ) -> Result<TransportResponse, AppError> {
        validate(&request)?;

        transport.owner_id = owner_id;
        transport.transport_type = request.transport_type;
        transport.model = request.model.trim().to_string();
        transport.color = request.color.trim().to_string();
        transport.identifier = request.identifier.trim().to_string();
        apply(&mut transport, request);
        transport.updated_at = chrono::Utc::now();

        // An open rent keeps the transport off the market
        match self.repository.update_transport(&transport).await? {
            UpdateTransportResult::Updated(updated) => {
                info!(transport_id = %updated.id, "Transport updated");
                Ok(updated.into())
            }
            UpdateTransportResult::CurrentlyRented => {
                warn!(transport_id = %transport.id, "Tried to list a transport that is being rented");
                Err(AppError::BadRequest(
                    "Transport is currently rented".to_string(),
                ))
            }
            UpdateTransportResult::TransportNotFound => {
                Err(AppError::NotFound("Transport not found".to_string()))
            }
            UpdateTransportResult::OwnerNotFound => {
                Err(AppError::NotFound("Owner not found".to_string()))
            }
        }
    }

    /// Deletes a transport the caller owns; not allowed while it's rented
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn delete_transport(
        &self,
        owner: &UserModel,
        transport_id: Uuid,
    ) -> Result<(), AppError> {
        let transport = self.find_transport(transport_id).await?;
        ensure_owner(owner, &transport)?;

        self.delete(transport_id, true).await
    }

    #[instrument(skip(self))]
    pub async fn admin_delete_transport(&self, transport_id: Uuid) -> Result<(), AppError> {
        self.delete(transport_id, false).await
    }

    async fn delete(&self, transport_id: Uuid, only_if_idle: bool) -> Result<(), AppError> {
        match self
            .repository
            .delete_transport(transport_id, only_if_idle)
            .await?
        {
            DeleteTransportResult::Deleted => {
                info!(transport_id = %transport_id, "Transport deleted");
                Ok(())
            }
            DeleteTransportResult::CurrentlyRented => Err(AppError::BadRequest(
                "Transport is currently rented".to_string(),
            )),
            DeleteTransportResult::TransportNotFound => {
                Err(AppError::NotFound("Transport not found".to_string()))
            }
        }
    }

    async fn find_transport(&self, transport_id: Uuid) -> Result<TransportModel, AppError> {
        self.repository
            .get_transport(transport_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transport not found".to_string()))
    }

    async fn find_owner(&self, owner_id: Uuid) -> Result<UserModel, AppError> {
        self.user_repository
            .get_user(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Owner not found".to_string()))
    }
}

fn ensure_owner(user: &UserModel, transport: &TransportModel) -> Result<(), AppError> {
    if transport.owner_id != user.id {
        warn!(
            user_id = %user.id,
            transport_id = %transport.id,
            "User does not own transport"
        );
        return Err(AppError::Forbidden(
            "You are not the owner of this transport".to_string(),
        ));
    }
    Ok(())
}

/// Copies the optional and positional fields onto the model
fn apply(transport: &mut TransportModel, request: TransportRequest) {
    transport.can_be_rented = request.can_be_rented;
    transport.description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    transport.latitude = request.latitude;
    transport.longitude = request.longitude;
    transport.minute_price = request.minute_price;
    transport.day_price = request.day_price;
}

fn validate(request: &TransportRequest) -> Result<(), AppError> {
    for (field, value) in [
        ("model", &request.model),
        ("color", &request.color),
        ("identifier", &request.identifier),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{} must not be empty", field)));
        }
    }

    if !request.latitude.is_finite() || !request.longitude.is_finite() {
        return Err(AppError::BadRequest("Invalid coordinates".to_string()));
    }

    for (field, price) in [
        ("minutePrice", request.minute_price),
        ("dayPrice", request.day_price),
    ] {
        if let Some(price) = price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "{} must be a non-negative number",
                    field
                )));
            }
        }
    }
    Ok(())
}
