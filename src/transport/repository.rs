use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{TransportModel, TransportType};
use crate::shared::{AppError, Pagination};
use crate::store::{db_error, InMemoryStore, PostgresStore};

const TRANSPORT_COLUMNS: &str = "id, owner_id, can_be_rented, transport_type, model, color, \
     identifier, description, latitude, longitude, minute_price, day_price, created_at, updated_at";

/// Narrowing for transport listings; `None` fields match everything
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportFilter {
    pub owner_id: Option<Uuid>,
    pub transport_type: Option<TransportType>,
}

/// Circle in degree space used by the public search
#[derive(Debug, Clone, Copy)]
pub struct SearchArea {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub transport_type: Option<TransportType>,
}

impl SearchArea {
    pub fn contains(&self, transport: &TransportModel) -> bool {
        transport.distance_to(self.latitude, self.longitude) <= self.radius
            && self
                .transport_type
                .map_or(true, |t| t == transport.transport_type)
    }
}

/// Result of replacing a transport
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateTransportResult {
    Updated(TransportModel),
    TransportNotFound,
    OwnerNotFound,
    /// Listing it for rent again while a rent is open on it
    CurrentlyRented,
}

/// Result of deleting a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTransportResult {
    Deleted,
    TransportNotFound,
    CurrentlyRented,
}

/// Trait for transport repository operations
#[async_trait]
pub trait TransportRepository {
    async fn create_transport(&self, transport: &TransportModel) -> Result<(), AppError>;
    async fn get_transport(&self, transport_id: Uuid) -> Result<Option<TransportModel>, AppError>;
    async fn list_transports(
        &self,
        filter: TransportFilter,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError>;

    /// Rentable transports inside the area
    async fn search_transports(
        &self,
        area: SearchArea,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError>;

    /// Replaces every column except `created_at`. Setting `can_be_rented`
    /// while a rent is open is refused in the same step as the write.
    async fn update_transport(
        &self,
        transport: &TransportModel,
    ) -> Result<UpdateTransportResult, AppError>;

    /// Deletes the transport along with its rent history. With `only_if_idle`
    /// an open rent blocks the delete, checked in the same step.
    async fn delete_transport(
        &self,
        transport_id: Uuid,
        only_if_idle: bool,
    ) -> Result<DeleteTransportResult, AppError>;
}

fn sorted_page(mut transports: Vec<TransportModel>, page: Pagination) -> Vec<TransportModel> {
    transports.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    page.apply(transports)
}

#[async_trait]
impl TransportRepository for InMemoryStore {
    #[instrument(skip(self, transport))]
    async fn create_transport(&self, transport: &TransportModel) -> Result<(), AppError> {
        debug!(transport_id = %transport.id, owner_id = %transport.owner_id, "Creating transport in memory");

        let mut tables = self.lock()?;
        if !tables.users.contains_key(&transport.owner_id) {
            warn!(owner_id = %transport.owner_id, "Owner does not exist");
            return Err(AppError::NotFound("Owner not found".to_string()));
        }
        if tables.transports.contains_key(&transport.id) {
            return Err(AppError::DatabaseError(
                "Transport already exists".to_string(),
            ));
        }
        tables.transports.insert(transport.id, transport.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_transport(&self, transport_id: Uuid) -> Result<Option<TransportModel>, AppError> {
        let tables = self.lock()?;
        Ok(tables.transports.get(&transport_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_transports(
        &self,
        filter: TransportFilter,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError> {
        let tables = self.lock()?;
        let matching = tables
            .transports
            .values()
            .filter(|t| filter.owner_id.map_or(true, |owner| t.owner_id == owner))
            .filter(|t| filter.transport_type.map_or(true, |kind| t.transport_type == kind))
            .cloned()
            .collect();

        Ok(sorted_page(matching, page))
    }

    #[instrument(skip(self))]
    async fn search_transports(
        &self,
        area: SearchArea,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError> {
        let tables = self.lock()?;
        let matching = tables
            .transports
            .values()
            .filter(|t| t.can_be_rented && area.contains(t))
            .cloned()
            .collect();

        Ok(sorted_page(matching, page))
    }

    #[instrument(skip(self, transport), fields(transport_id = %transport.id))]
    async fn update_transport(
        &self,
        transport: &TransportModel,
    ) -> Result<UpdateTransportResult, AppError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&transport.owner_id) {
            return Ok(UpdateTransportResult::OwnerNotFound);
        }
        if transport.can_be_rented && tables.has_open_rent(transport.id) {
            warn!("Transport can't be listed while it's rented");
            return Ok(UpdateTransportResult::CurrentlyRented);
        }

        let Some(stored) = tables.transports.get_mut(&transport.id) else {
            warn!("Transport not found for update in memory");
            return Ok(UpdateTransportResult::TransportNotFound);
        };
        let created_at = stored.created_at;
        *stored = transport.clone();
        stored.created_at = created_at;

        Ok(UpdateTransportResult::Updated(stored.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_transport(
        &self,
        transport_id: Uuid,
        only_if_idle: bool,
    ) -> Result<DeleteTransportResult, AppError> {
        let mut tables = self.lock()?;
        if !tables.transports.contains_key(&transport_id) {
            return Ok(DeleteTransportResult::TransportNotFound);
        }
        if only_if_idle && tables.has_open_rent(transport_id) {
            return Ok(DeleteTransportResult::CurrentlyRented);
        }

        tables.transports.remove(&transport_id);
        let before = tables.rents.len();
        tables.rents.retain(|_, r| r.transport_id != transport_id);

        info!(
            transport_id = %transport_id,
            rents_removed = before - tables.rents.len(),
            "Transport deleted from memory"
        );
        Ok(DeleteTransportResult::Deleted)
    }
}

/// Row-locks the transport so rent claims on it wait for this transaction
async fn lock_transport(
    tx: &mut Transaction<'_, Postgres>,
    transport_id: Uuid,
) -> Result<bool, AppError> {
    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM transports WHERE id = $1 FOR UPDATE")
        .bind(transport_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to lock transport", e))?;

    Ok(locked.is_some())
}

async fn has_open_rent(
    tx: &mut Transaction<'_, Postgres>,
    transport_id: Uuid,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM rents WHERE transport_id = $1 AND time_end IS NULL)",
    )
    .bind(transport_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to check open rents", e))
}

async fn begin(store: &PostgresStore) -> Result<Transaction<'static, Postgres>, AppError> {
    store
        .pool
        .begin()
        .await
        .map_err(|e| db_error("Failed to begin transaction", e))
}

#[async_trait]
impl TransportRepository for PostgresStore {
    #[instrument(skip(self, transport))]
    async fn create_transport(&self, transport: &TransportModel) -> Result<(), AppError> {
        debug!(transport_id = %transport.id, owner_id = %transport.owner_id, "Creating transport in database");

        sqlx::query(
            "INSERT INTO transports (id, owner_id, can_be_rented, transport_type, model, color, \
             identifier, description, latitude, longitude, minute_price, day_price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(transport.id)
        .bind(transport.owner_id)
        .bind(transport.can_be_rented)
        .bind(transport.transport_type)
        .bind(&transport.model)
        .bind(&transport.color)
        .bind(&transport.identifier)
        .bind(&transport.description)
        .bind(transport.latitude)
        .bind(transport.longitude)
        .bind(transport.minute_price)
        .bind(transport.day_price)
        .bind(transport.created_at)
        .bind(transport.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create transport in database", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_transport(&self, transport_id: Uuid) -> Result<Option<TransportModel>, AppError> {
        sqlx::query_as::<_, TransportModel>(&format!(
            "SELECT {TRANSPORT_COLUMNS} FROM transports WHERE id = $1"
        ))
        .bind(transport_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch transport from database", e))
    }

    #[instrument(skip(self))]
    async fn list_transports(
        &self,
        filter: TransportFilter,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError> {
        sqlx::query_as::<_, TransportModel>(&format!(
            "SELECT {TRANSPORT_COLUMNS} FROM transports \
             WHERE ($1::uuid IS NULL OR owner_id = $1) \
             AND ($2::transport_type IS NULL OR transport_type = $2) \
             ORDER BY created_at, id OFFSET $3 LIMIT $4"
        ))
        .bind(filter.owner_id)
        .bind(filter.transport_type)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list transports", e))
    }

    #[instrument(skip(self))]
    async fn search_transports(
        &self,
        area: SearchArea,
        page: Pagination,
    ) -> Result<Vec<TransportModel>, AppError> {
        sqlx::query_as::<_, TransportModel>(&format!(
            "SELECT {TRANSPORT_COLUMNS} FROM transports \
             WHERE can_be_rented \
             AND sqrt(power(latitude - $1, 2) + power(longitude - $2, 2)) <= $3 \
             AND ($4::transport_type IS NULL OR transport_type = $4) \
             ORDER BY created_at, id OFFSET $5 LIMIT $6"
        ))
        .bind(area.latitude)
        .bind(area.longitude)
        .bind(area.radius)
        .bind(area.transport_type)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to search transports", e))
    }

    #[instrument(skip(self, transport), fields(transport_id = %transport.id))]
    async fn update_transport(
        &self,
        transport: &TransportModel,
    ) -> Result<UpdateTransportResult, AppError> {
        let mut tx = begin(self).await?;

        // Dropping the transaction rolls back
        if !lock_transport(&mut tx, transport.id).await? {
            warn!("Transport not found for update");
            return Ok(UpdateTransportResult::TransportNotFound);
        }
        let owner_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(transport.owner_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to check transport owner", e))?;
        if !owner_exists {
            return Ok(UpdateTransportResult::OwnerNotFound);
        }
        if transport.can_be_rented && has_open_rent(&mut tx, transport.id).await? {
            warn!("Transport can't be listed while it's rented");
            return Ok(UpdateTransportResult::CurrentlyRented);
        }

        let updated = sqlx::query_as::<_, TransportModel>(&format!(
            "UPDATE transports SET owner_id = $2, can_be_rented = $3, transport_type = $4, \
             model = $5, color = $6, identifier = $7, description = $8, latitude = $9, \
             longitude = $10, minute_price = $11, day_price = $12, updated_at = $13 \
             WHERE id = $1 RETURNING {TRANSPORT_COLUMNS}"
        ))
        .bind(transport.id)
        .bind(transport.owner_id)
        .bind(transport.can_be_rented)
        .bind(transport.transport_type)
        .bind(&transport.model)
        .bind(&transport.color)
        .bind(&transport.identifier)
        .bind(&transport.description)
        .bind(transport.latitude)
        .bind(transport.longitude)
        .bind(transport.minute_price)
        .bind(transport.day_price)
        .bind(transport.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update transport in database", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transport update", e))?;
        Ok(UpdateTransportResult::Updated(updated))
    }

    #[instrument(skip(self))]
    async fn delete_transport(
        &self,
        transport_id: Uuid,
        only_if_idle: bool,
    ) -> Result<DeleteTransportResult, AppError> {
        let mut tx = begin(self).await?;

        if !lock_transport(&mut tx, transport_id).await? {
            return Ok(DeleteTransportResult::TransportNotFound);
        }
        if only_if_idle && has_open_rent(&mut tx, transport_id).await? {
            return Ok(DeleteTransportResult::CurrentlyRented);
        }

        // Rents go with the row via ON DELETE CASCADE
        sqlx::query("DELETE FROM transports WHERE id = $1")
            .bind(transport_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete transport", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transport deletion", e))?;
        Ok(DeleteTransportResult::Deleted)
    }
}
