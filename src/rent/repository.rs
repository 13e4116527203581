use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::RentModel;
use crate::shared::{AppError, Pagination};
use crate::store::{db_error, InMemoryStore, PostgresStore};

const RENT_COLUMNS: &str = "id, transport_id, user_id, time_start, time_end, price_of_unit, \
     price_type, final_price, created_at, updated_at";

/// Narrowing for rent listings; `None` fields match everything
#[derive(Debug, Clone, Copy, Default)]
pub struct RentFilter {
    pub user_id: Option<Uuid>,
    pub transport_id: Option<Uuid>,
    pub open_only: bool,
}

/// Result of attempting to insert a rent
#[derive(Debug, Clone)]
pub enum CreateRentResult {
    Created(RentModel),
    TransportNotFound,
    UserNotFound,
    /// The transport is already taken by another open rent
    TransportUnavailable,
}

/// Result of attempting to replace a rent
#[derive(Debug, Clone)]
pub enum UpdateRentResult {
    Updated(RentModel),
    RentNotFound,
    TransportNotFound,
    UserNotFound,
    TransportUnavailable,
}

/// Values written when a rent ends
#[derive(Debug, Clone, Copy)]
pub struct RentClosing {
    pub rent_id: Uuid,
    pub time_end: DateTime<Utc>,
    pub final_price: f64,
    /// Where the transport was left
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of attempting to end a rent
#[derive(Debug, Clone)]
pub enum CloseRentResult {
    Closed(RentModel),
    RentNotFound,
    AlreadyClosed,
}

/// Trait for rent repository operations
#[async_trait]
pub trait RentRepository {
    /// Inserts the rent. An open rent atomically takes its transport off the
    /// market, so of two racing opens only one succeeds.
    async fn create_rent(&self, rent: &RentModel) -> Result<CreateRentResult, AppError>;

    async fn get_rent(&self, rent_id: Uuid) -> Result<Option<RentModel>, AppError>;

    async fn list_rents(
        &self,
        filter: RentFilter,
        page: Pagination,
    ) -> Result<Vec<RentModel>, AppError>;

    /// Atomically closes an open rent, parks and releases the transport and
    /// charges the renter. A rent can be closed only once.
    async fn close_rent(&self, closing: RentClosing) -> Result<CloseRentResult, AppError>;

    /// Full replacement; transport availability follows the open/closed state
    async fn update_rent(&self, rent: &RentModel) -> Result<UpdateRentResult, AppError>;

    /// Removes the rent, releasing its transport if it was still open
    async fn delete_rent(&self, rent_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
impl RentRepository for InMemoryStore {
    #[instrument(skip(self, rent), fields(rent_id = %rent.id, transport_id = %rent.transport_id))]
    async fn create_rent(&self, rent: &RentModel) -> Result<CreateRentResult, AppError> {
        let mut tables = self.lock()?;

        if !tables.users.contains_key(&rent.user_id) {
            return Ok(CreateRentResult::UserNotFound);
        }
        let Some(transport) = tables.transports.get_mut(&rent.transport_id) else {
            return Ok(CreateRentResult::TransportNotFound);
        };

        if rent.is_open() {
            if !transport.can_be_rented {
                debug!("Transport is not available");
                return Ok(CreateRentResult::TransportUnavailable);
            }
            transport.can_be_rented = false;
            transport.updated_at = Utc::now();
        }
        tables.rents.insert(rent.id, rent.clone());

        info!(user_id = %rent.user_id, "Rent created in memory");
        Ok(CreateRentResult::Created(rent.clone()))
    }

    #[instrument(skip(self))]
    async fn get_rent(&self, rent_id: Uuid) -> Result<Option<RentModel>, AppError> {
        let tables = self.lock()?;
        Ok(tables.rents.get(&rent_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_rents(
        &self,
        filter: RentFilter,
        page: Pagination,
    ) -> Result<Vec<RentModel>, AppError> {
        let tables = self.lock()?;
        let mut rents: Vec<RentModel> = tables
            .rents
            .values()
            .filter(|r| filter.user_id.map_or(true, |id| r.user_id == id))
            .filter(|r| filter.transport_id.map_or(true, |id| r.transport_id == id))
            .filter(|r| !filter.open_only || r.is_open())
            .cloned()
            .collect();
        rents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(page.apply(rents))
    }

    #[instrument(skip(self, closing), fields(rent_id = %closing.rent_id))]
    async fn close_rent(&self, closing: RentClosing) -> Result<CloseRentResult, AppError> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let rent = match tables.rents.get_mut(&closing.rent_id) {
            Some(rent) if rent.is_open() => rent,
            Some(_) => return Ok(CloseRentResult::AlreadyClosed),
            None => return Ok(CloseRentResult::RentNotFound),
        };
        rent.time_end = Some(closing.time_end);
        rent.final_price = Some(closing.final_price);
        rent.updated_at = closing.time_end;
        let closed = rent.clone();

        if let Some(transport) = tables.transports.get_mut(&closed.transport_id) {
            transport.latitude = closing.latitude;
            transport.longitude = closing.longitude;
            transport.can_be_rented = true;
            transport.updated_at = now;
        }
        if let Some(user) = tables.users.get_mut(&closed.user_id) {
            user.balance -= closing.final_price;
            user.updated_at = now;
        }

        info!(
            user_id = %closed.user_id,
            final_price = closing.final_price,
            "Rent closed in memory"
        );
        Ok(CloseRentResult::Closed(closed))
    }

    #[instrument(skip(self, rent), fields(rent_id = %rent.id))]
    async fn update_rent(&self, rent: &RentModel) -> Result<UpdateRentResult, AppError> {
        let mut tables = self.lock()?;

        let Some(previous) = tables.rents.get(&rent.id).cloned() else {
            return Ok(UpdateRentResult::RentNotFound);
        };
        if !tables.users.contains_key(&rent.user_id) {
            return Ok(UpdateRentResult::UserNotFound);
        }
        let Some(target) = tables.transports.get(&rent.transport_id) else {
            return Ok(UpdateRentResult::TransportNotFound);
        };

        let moved = previous.transport_id != rent.transport_id;
        let release = previous.is_open() && (moved || !rent.is_open());
        let claim = rent.is_open() && (moved || !previous.is_open());
        if claim && !target.can_be_rented {
            return Ok(UpdateRentResult::TransportUnavailable);
        }

        let now = Utc::now();
        if release {
            if let Some(transport) = tables.transports.get_mut(&previous.transport_id) {
                transport.can_be_rented = true;
                transport.updated_at = now;
            }
        }
        if claim {
            if let Some(transport) = tables.transports.get_mut(&rent.transport_id) {
                transport.can_be_rented = false;
                transport.updated_at = now;
            }
        }
        tables.rents.insert(rent.id, rent.clone());

        Ok(UpdateRentResult::Updated(rent.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_rent(&self, rent_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let Some(rent) = tables.rents.remove(&rent_id) else {
            return Ok(false);
        };

        if rent.is_open() {
            if let Some(transport) = tables.transports.get_mut(&rent.transport_id) {
                transport.can_be_rented = true;
                transport.updated_at = Utc::now();
            }
        }
        Ok(true)
    }
}

async fn exists(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id: Uuid,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to check row existence", e))
}

/// Takes the transport if it's free; `false` if it's missing or taken
async fn claim_transport(
    tx: &mut Transaction<'_, Postgres>,
    transport_id: Uuid,
) -> Result<bool, AppError> {
    let claimed = sqlx::query(
        "UPDATE transports SET can_be_rented = FALSE, updated_at = now() \
         WHERE id = $1 AND can_be_rented",
    )
    .bind(transport_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to claim transport", e))?;

    Ok(claimed.rows_affected() > 0)
}

async fn release_transport(
    tx: &mut Transaction<'_, Postgres>,
    transport_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("UPDATE transports SET can_be_rented = TRUE, updated_at = now() WHERE id = $1")
        .bind(transport_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to release transport", e))?;
    Ok(())
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| db_error("Failed to commit transaction", e))
}

#[async_trait]
impl RentRepository for PostgresStore {
    #[instrument(skip(self, rent), fields(rent_id = %rent.id, transport_id = %rent.transport_id))]
    async fn create_rent(&self, rent: &RentModel) -> Result<CreateRentResult, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        if !exists(&mut tx, "users", rent.user_id).await? {
            return Ok(CreateRentResult::UserNotFound);
        }
        if !exists(&mut tx, "transports", rent.transport_id).await? {
            return Ok(CreateRentResult::TransportNotFound);
        }
        // Dropping the transaction rolls back
        if rent.is_open() && !claim_transport(&mut tx, rent.transport_id).await? {
            debug!("Transport is not available");
            return Ok(CreateRentResult::TransportUnavailable);
        }

        sqlx::query(
            "INSERT INTO rents (id, transport_id, user_id, time_start, time_end, price_of_unit, \
             price_type, final_price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(rent.id)
        .bind(rent.transport_id)
        .bind(rent.user_id)
        .bind(rent.time_start)
        .bind(rent.time_end)
        .bind(rent.price_of_unit)
        .bind(rent.price_type)
        .bind(rent.final_price)
        .bind(rent.created_at)
        .bind(rent.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert rent", e))?;

        commit(tx).await?;

        info!(user_id = %rent.user_id, "Rent created in database");
        Ok(CreateRentResult::Created(rent.clone()))
    }

    #[instrument(skip(self))]
    async fn get_rent(&self, rent_id: Uuid) -> Result<Option<RentModel>, AppError> {
        sqlx::query_as::<_, RentModel>(&format!("SELECT {RENT_COLUMNS} FROM rents WHERE id = $1"))
            .bind(rent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch rent from database", e))
    }

    #[instrument(skip(self))]
    async fn list_rents(
        &self,
        filter: RentFilter,
        page: Pagination,
    ) -> Result<Vec<RentModel>, AppError> {
        sqlx::query_as::<_, RentModel>(&format!(
            "SELECT {RENT_COLUMNS} FROM rents \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             AND ($2::uuid IS NULL OR transport_id = $2) \
             AND (NOT $3 OR time_end IS NULL) \
             ORDER BY created_at, id OFFSET $4 LIMIT $5"
        ))
        .bind(filter.user_id)
        .bind(filter.transport_id)
        .bind(filter.open_only)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list rents", e))
    }

    #[instrument(skip(self, closing), fields(rent_id = %closing.rent_id))]
    async fn close_rent(&self, closing: RentClosing) -> Result<CloseRentResult, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let closed = sqlx::query_as::<_, RentModel>(&format!(
            "UPDATE rents SET time_end = $2, final_price = $3, updated_at = $2 \
             WHERE id = $1 AND time_end IS NULL RETURNING {RENT_COLUMNS}"
        ))
        .bind(closing.rent_id)
        .bind(closing.time_end)
        .bind(closing.final_price)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to close rent", e))?;

        let Some(closed) = closed else {
            return if exists(&mut tx, "rents", closing.rent_id).await? {
                Ok(CloseRentResult::AlreadyClosed)
            } else {
                Ok(CloseRentResult::RentNotFound)
            };
        };

        sqlx::query(
            "UPDATE transports SET latitude = $2, longitude = $3, can_be_rented = TRUE, \
             updated_at = now() WHERE id = $1",
        )
        .bind(closed.transport_id)
        .bind(closing.latitude)
        .bind(closing.longitude)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to park transport", e))?;

        sqlx::query("UPDATE users SET balance = balance - $2, updated_at = now() WHERE id = $1")
            .bind(closed.user_id)
            .bind(closing.final_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to charge renter", e))?;

        commit(tx).await?;

        info!(
            user_id = %closed.user_id,
            final_price = closing.final_price,
            "Rent closed in database"
        );
        Ok(CloseRentResult::Closed(closed))
    }

    #[instrument(skip(self, rent), fields(rent_id = %rent.id))]
    async fn update_rent(&self, rent: &RentModel) -> Result<UpdateRentResult, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let previous = sqlx::query_as::<_, RentModel>(&format!(
            "SELECT {RENT_COLUMNS} FROM rents WHERE id = $1 FOR UPDATE"
        ))
        .bind(rent.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock rent", e))?;

        let Some(previous) = previous else {
            return Ok(UpdateRentResult::RentNotFound);
        };
        if !exists(&mut tx, "users", rent.user_id).await? {
            return Ok(UpdateRentResult::UserNotFound);
        }
        if !exists(&mut tx, "transports", rent.transport_id).await? {
            return Ok(UpdateRentResult::TransportNotFound);
        }

        let moved = previous.transport_id != rent.transport_id;
        if previous.is_open() && (moved || !rent.is_open()) {
            release_transport(&mut tx, previous.transport_id).await?;
        }
        if rent.is_open()
            && (moved || !previous.is_open())
            && !claim_transport(&mut tx, rent.transport_id).await?
        {
            return Ok(UpdateRentResult::TransportUnavailable);
        }

        sqlx::query(
            "UPDATE rents SET transport_id = $2, user_id = $3, time_start = $4, time_end = $5, \
             price_of_unit = $6, price_type = $7, final_price = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(rent.id)
        .bind(rent.transport_id)
        .bind(rent.user_id)
        .bind(rent.time_start)
        .bind(rent.time_end)
        .bind(rent.price_of_unit)
        .bind(rent.price_type)
        .bind(rent.final_price)
        .bind(rent.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update rent", e))?;

        commit(tx).await?;
        Ok(UpdateRentResult::Updated(rent.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_rent(&self, rent_id: Uuid) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let deleted = sqlx::query_as::<_, RentModel>(&format!(
            "DELETE FROM rents WHERE id = $1 RETURNING {RENT_COLUMNS}"
        ))
        .bind(rent_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to delete rent", e))?;

        let Some(deleted) = deleted else {
            warn!(rent_id = %rent_id, "Rent not found for deletion");
            return Ok(false);
        };
        if deleted.is_open() {
            release_transport(&mut tx, deleted.transport_id).await?;
        }

        commit(tx).await?;
        Ok(true)
    }
}
