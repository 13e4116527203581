use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    clock::Clock,
    models::{PriceType, RentModel},
    pricing,
    repository::{
        CloseRentResult, CreateRentResult, RentClosing, RentFilter, RentRepository,
        UpdateRentResult,
    },
    types::{AdminRentRequest, AdminRentUpdateRequest, RentResponse, SearchQuery},
};
use crate::account::{models::UserModel, repository::UserRepository};
use crate::shared::{AppError, Pagination};
use crate::transport::{
    models::TransportModel,
    repository::{SearchArea, TransportRepository},
    types::TransportResponse,
};

/// Service for the rent lifecycle and rent history
pub struct RentService {
    repository: Arc<dyn RentRepository + Send + Sync>,
    transport_repository: Arc<dyn TransportRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl RentService {
    pub fn new(
        repository: Arc<dyn RentRepository + Send + Sync>,
        transport_repository: Arc<dyn TransportRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            transport_repository,
            user_repository,
            clock,
        }
    }

    /// Rentable transports around a point
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: SearchQuery,
        page: Pagination,
    ) -> Result<Vec<TransportResponse>, AppError> {
        validate_coordinates(query.lat, query.long)?;
        if !query.radius.is_finite() || query.radius < 0.0 {
            return Err(AppError::BadRequest(
                "radius must be a non-negative number".to_string(),
            ));
        }

        let area = SearchArea {
            latitude: query.lat,
            longitude: query.long,
            radius: query.radius,
            transport_type: query.transport_type.transport_type(),
        };
        let transports = self
            .transport_repository
            .search_transports(area, page.validated()?)
            .await?;

        debug!(found = transports.len(), "Transport search finished");
        Ok(transports.into_iter().map(TransportResponse::from).collect())
    }

    /// A rent is visible to its renter and to the transport owner
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_rent(&self, user: &UserModel, rent_id: Uuid) -> Result<RentResponse, AppError> {
        let rent = self.find_rent(rent_id).await?;
        if rent.user_id == user.id {
            return Ok(rent.into());
        }

        let owns_transport = self
            .transport_repository
            .get_transport(rent.transport_id)
            .await?
            .map_or(false, |t| t.owner_id == user.id);
        if !owns_transport {
            warn!(rent_id = %rent_id, "User is neither renter nor owner");
            return Err(AppError::Forbidden(
                "You have no access to this rent".to_string(),
            ));
        }

        Ok(rent.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn my_history(
        &self,
        user: &UserModel,
        page: Pagination,
    ) -> Result<Vec<RentResponse>, AppError> {
        self.history(
            RentFilter {
                user_id: Some(user.id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    /// Rent history of a transport, visible to its owner only
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn transport_history(
        &self,
        user: &UserModel,
        transport_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<RentResponse>, AppError> {
        let transport = self.find_transport(transport_id).await?;
        if transport.owner_id != user.id {
            return Err(AppError::Forbidden(
                "You are not the owner of this transport".to_string(),
            ));
        }

        self.admin_transport_history(transport_id, page).await
    }

    /// Opens a rent at the transport's current unit price
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn open_rent(
        &self,
        user: &UserModel,
        transport_id: Uuid,
        price_type: PriceType,
    ) -> Result<RentResponse, AppError> {
        let transport = self.find_transport(transport_id).await?;

        if transport.owner_id == user.id {
            return Err(AppError::BadRequest(
                "Can't rent your own transport".to_string(),
            ));
        }
        if !transport.can_be_rented {
            return Err(AppError::BadRequest(
                "Transport is already rented".to_string(),
            ));
        }
        let price_of_unit = unit_price(&transport, price_type)?;

        let rent = RentModel::open(
            transport.id,
            user.id,
            self.clock.now(),
            price_of_unit,
            price_type,
        );
        let created = self.insert(rent).await?;

        info!(
            rent_id = %created.id,
            transport_id = %transport_id,
            price_type = %price_type,
            price_of_unit,
            "Rent opened"
        );
        Ok(created.into())
    }

    /// Ends the caller's own rent, leaving the transport at (lat, long)
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn end_rent(
        &self,
        user: &UserModel,
        rent_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<RentResponse, AppError> {
        validate_coordinates(latitude, longitude)?;

        let rent = self.find_rent(rent_id).await?;
        if rent.user_id != user.id {
            warn!(rent_id = %rent_id, "User tried to end someone else's rent");
            return Err(AppError::Forbidden("This is not your rent".to_string()));
        }

        self.close(rent, latitude, longitude).await
    }

    #[instrument(skip(self))]
    pub async fn admin_get_rent(&self, rent_id: Uuid) -> Result<RentResponse, AppError> {
        Ok(self.find_rent(rent_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn admin_user_history(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<RentResponse>, AppError> {
        if self.user_repository.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.history(
            RentFilter {
                user_id: Some(user_id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn admin_transport_history(
        &self,
        transport_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<RentResponse>, AppError> {
        self.find_transport(transport_id).await?;

        self.history(
            RentFilter {
                transport_id: Some(transport_id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    /// Records an arbitrary rent. A closed rent without a final price gets one
    /// computed from its span; no balance is charged.
    #[instrument(skip(self, request), fields(transport_id = %request.transport_id, user_id = %request.user_id))]
    pub async fn admin_create_rent(
        &self,
        request: AdminRentRequest,
    ) -> Result<RentResponse, AppError> {
        let mut rent = RentModel::open(
            request.transport_id,
            request.user_id,
            request.time_start,
            request.price_of_unit,
            request.price_type,
        );
        rent.time_end = request.time_end;
        rent.final_price = request.final_price;
        rent.created_at = self.clock.now();
        rent.updated_at = rent.created_at;
        settle(&mut rent);
        validate_rent(&rent)?;

        let created = self.insert(rent).await?;

        info!(rent_id = %created.id, open = created.is_open(), "Rent created by admin");
        Ok(created.into())
    }

    /// Ends any open rent
    #[instrument(skip(self))]
    pub async fn admin_end_rent(
        &self,
        rent_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<RentResponse, AppError> {
        validate_coordinates(latitude, longitude)?;

        let rent = self.find_rent(rent_id).await?;
        self.close(rent, latitude, longitude).await
    }

    #[instrument(skip(self, request))]
    pub async fn admin_update_rent(
        &self,
        rent_id: Uuid,
        request: AdminRentUpdateRequest,
    ) -> Result<RentResponse, AppError> {
        let mut rent = self.find_rent(rent_id).await?;

        if let Some(transport_id) = request.transport_id {
            rent.transport_id = transport_id;
        }
        if let Some(user_id) = request.user_id {
            rent.user_id = user_id;
        }
        if let Some(time_start) = request.time_start {
            rent.time_start = time_start;
        }
        if let Some(time_end) = request.time_end {
            rent.time_end = time_end;
        }
        if let Some(price_of_unit) = request.price_of_unit {
            rent.price_of_unit = price_of_unit;
        }
        if let Some(price_type) = request.price_type {
            rent.price_type = price_type;
        }
        if let Some(final_price) = request.final_price {
            rent.final_price = final_price;
        }
        if rent.is_open() {
            rent.final_price = None;
        }
        settle(&mut rent);
        validate_rent(&rent)?;
        rent.updated_at = self.clock.now();

        let updated = match self.repository.update_rent(&rent).await? {
            UpdateRentResult::Updated(rent) => rent,
            UpdateRentResult::RentNotFound => {
                return Err(AppError::NotFound("Rent not found".to_string()))
            }
            UpdateRentResult::TransportNotFound => {
                return Err(AppError::NotFound("Transport not found".to_string()))
            }
            UpdateRentResult::UserNotFound => {
                return Err(AppError::NotFound("User not found".to_string()))
            }
            UpdateRentResult::TransportUnavailable => {
                return Err(AppError::BadRequest(
                    "Transport is already rented".to_string(),
                ))
            }
        };

        info!(rent_id = %rent_id, "Rent updated by admin");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn admin_delete_rent(&self, rent_id: Uuid) -> Result<(), AppError> {
        if !self.repository.delete_rent(rent_id).await? {
            return Err(AppError::NotFound("Rent not found".to_string()));
        }

        info!(rent_id = %rent_id, "Rent deleted by admin");
        Ok(())
    }

    async fn history(
        &self,
        filter: RentFilter,
        page: Pagination,
    ) -> Result<Vec<RentResponse>, AppError> {
        let rents = self
            .repository
            .list_rents(filter, page.validated()?)
            .await?;
        Ok(rents.into_iter().map(RentResponse::from).collect())
    }

    async fn insert(&self, rent: RentModel) -> Result<RentModel, AppError> {
        match self.repository.create_rent(&rent).await? {
            CreateRentResult::Created(rent) => Ok(rent),
            CreateRentResult::TransportNotFound => {
                Err(AppError::NotFound("Transport not found".to_string()))
            }
            CreateRentResult::UserNotFound => Err(AppError::NotFound("User not found".to_string())),
            CreateRentResult::TransportUnavailable => {
                debug!(transport_id = %rent.transport_id, "Lost the race for the transport");
                Err(AppError::BadRequest(
                    "Transport is already rented".to_string(),
                ))
            }
        }
    }

    async fn close(
        &self,
        rent: RentModel,
        latitude: f64,
        longitude: f64,
    ) -> Result<RentResponse, AppError> {
        if !rent.is_open() {
            return Err(AppError::BadRequest("Rent already ended".to_string()));
        }

        let time_end = self.clock.now();
        let final_price =
            pricing::final_price(rent.price_type, rent.price_of_unit, rent.time_start, time_end);

        let closing = RentClosing {
            rent_id: rent.id,
            time_end,
            final_price,
            latitude,
            longitude,
        };
        match self.repository.close_rent(closing).await? {
            CloseRentResult::Closed(closed) => {
                info!(
                    rent_id = %closed.id,
                    final_price,
                    "Rent ended"
                );
                Ok(closed.into())
            }
            CloseRentResult::AlreadyClosed => {
                Err(AppError::BadRequest("Rent already ended".to_string()))
            }
            CloseRentResult::RentNotFound => Err(AppError::NotFound("Rent not found".to_string())),
        }
    }

    async fn find_rent(&self, rent_id: Uuid) -> Result<RentModel, AppError> {
        self.repository
            .get_rent(rent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rent not found".to_string()))
    }

    async fn find_transport(&self, transport_id: Uuid) -> Result<TransportModel, AppError> {
        self.transport_repository
            .get_transport(transport_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transport not found".to_string()))
    }
}

fn unit_price(transport: &TransportModel, price_type: PriceType) -> Result<f64, AppError> {
    let price = match price_type {
        PriceType::Minutes => transport.minute_price,
        PriceType::Days => transport.day_price,
    };
    price.ok_or_else(|| {
        AppError::BadRequest(format!(
            "Transport has no price for {}",
            price_type.to_string().to_lowercase()
        ))
    })
}

/// Fills in the final price of a closed rent that lacks one
fn settle(rent: &mut RentModel) {
    if let (Some(time_end), None) = (rent.time_end, rent.final_price) {
        rent.final_price = Some(pricing::final_price(
            rent.price_type,
            rent.price_of_unit,
            rent.time_start,
            time_end,
        ));
    }
}

fn validate_rent(rent: &RentModel) -> Result<(), AppError> {
    if !rent.price_of_unit.is_finite() || rent.price_of_unit < 0.0 {
        return Err(AppError::BadRequest(
            "priceOfUnit must be a non-negative number".to_string(),
        ));
    }
    if let Some(time_end) = rent.time_end {
        if time_end < rent.time_start {
            return Err(AppError::BadRequest(
                "timeEnd must not precede timeStart".to_string(),
            ));
        }
    }
    if let Some(final_price) = rent.final_price {
        if !final_price.is_finite() {
            return Err(AppError::BadRequest("finalPrice must be a number".to_string()));
        }
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(AppError::BadRequest("Invalid coordinates".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rent::clock::FixedClock;
    use crate::shared::test_utils::seed_user;
    use crate::store::InMemoryStore;
    use crate::transport::models::{TransportType, TransportTypeFilter};
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
        service: RentService,
        owner: UserModel,
        renter: UserModel,
        transport: TransportModel,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let owner = seed_user(&store, "owner", false).await;
        let renter = seed_user(&store, "renter", false).await;

        let mut transport =
            TransportModel::new(owner.id, TransportType::Scooter, "Ninebot", "black", "S1");
        transport.latitude = 54.3;
        transport.longitude = 48.4;
        transport.minute_price = Some(5.0);
        transport.day_price = Some(1200.0);
        store.create_transport(&transport).await.unwrap();

        let service = RentService::new(store.clone(), store.clone(), store.clone(), clock.clone());
        Fixture {
            store,
            clock,
            service,
            owner,
            renter,
            transport,
        }
    }

    #[tokio::test]
    async fn test_minute_rent_is_charged_per_started_minute() {
        let f = fixture().await;

        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();
        assert_eq!(rent.price_of_unit, 5.0);
        assert!(rent.time_end.is_none());

        f.clock.advance(Duration::seconds(125));
        let ended = f
            .service
            .end_rent(&f.renter, rent.id, 54.35, 48.45)
            .await
            .unwrap();
        assert_eq!(ended.final_price, Some(15.0));

        let renter = f.store.get_user(f.renter.id).await.unwrap().unwrap();
        assert_eq!(renter.balance, -15.0);

        let transport = f.store.get_transport(f.transport.id).await.unwrap().unwrap();
        assert!(transport.can_be_rented);
        assert_eq!(transport.latitude, 54.35);
    }

    #[tokio::test]
    async fn test_day_rent_is_fractional() {
        let f = fixture().await;

        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Days)
            .await
            .unwrap();
        f.clock.advance(Duration::hours(36));

        let ended = f
            .service
            .end_rent(&f.renter, rent.id, 0.0, 0.0)
            .await
            .unwrap();
        assert_eq!(ended.final_price, Some(1800.0));
    }

    #[tokio::test]
    async fn test_owner_cannot_rent_own_transport() {
        let f = fixture().await;

        let result = f
            .service
            .open_rent(&f.owner, f.transport.id, PriceType::Minutes)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_missing_price_for_type_rejected() {
        let f = fixture().await;
        let mut bike = TransportModel::new(f.owner.id, TransportType::Bike, "Stels", "blue", "B1");
        bike.minute_price = Some(2.0);
        f.store.create_transport(&bike).await.unwrap();

        let result = f
            .service
            .open_rent(&f.renter, bike.id, PriceType::Days)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_second_rent_on_taken_transport_rejected() {
        let f = fixture().await;
        let third = seed_user(&f.store, "third", false).await;

        f.service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();
        let result = f
            .service
            .open_rent(&third, f.transport.id, PriceType::Minutes)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_transport_not_found() {
        let f = fixture().await;

        let result = f
            .service
            .open_rent(&f.renter, Uuid::new_v4(), PriceType::Minutes)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_only_renter_may_end_and_only_once() {
        let f = fixture().await;
        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();

        let by_owner = f.service.end_rent(&f.owner, rent.id, 0.0, 0.0).await;
        assert!(matches!(by_owner, Err(AppError::Forbidden(_))));

        f.service
            .end_rent(&f.renter, rent.id, 0.0, 0.0)
            .await
            .unwrap();
        let again = f.service.end_rent(&f.renter, rent.id, 0.0, 0.0).await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_end_rejects_invalid_coordinates_without_closing() {
        let f = fixture().await;
        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();

        let result = f.service.end_rent(&f.renter, rent.id, f64::NAN, 0.0).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let stored = f.store.get_rent(rent.id).await.unwrap().unwrap();
        assert!(stored.is_open());
    }

    #[tokio::test]
    async fn test_rent_visibility() {
        let f = fixture().await;
        let stranger = seed_user(&f.store, "stranger", false).await;
        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();

        assert!(f.service.get_rent(&f.renter, rent.id).await.is_ok());
        assert!(f.service.get_rent(&f.owner, rent.id).await.is_ok());
        let result = f.service.get_rent(&stranger, rent.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_transport_history_owner_only() {
        let f = fixture().await;
        f.service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();

        let history = f
            .service
            .transport_history(&f.owner, f.transport.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let result = f
            .service
            .transport_history(&f.renter, f.transport.id, Pagination::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let mine = f
            .service
            .my_history(&f.renter, Pagination::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_search_hides_rented_transport() {
        let f = fixture().await;
        let query = SearchQuery {
            lat: 54.3,
            long: 48.4,
            radius: 0.1,
            transport_type: TransportTypeFilter::Scooter,
        };

        let found = f.service.search(query, Pagination::default()).await.unwrap();
        assert_eq!(found.len(), 1);

        f.service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();
        let found = f.service.search(query, Pagination::default()).await.unwrap();
        assert!(found.is_empty());

        let negative = f
            .service
            .search(SearchQuery { radius: -1.0, ..query }, Pagination::default())
            .await;
        assert!(matches!(negative, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_admin_create_closed_rent_computes_price() {
        let f = fixture().await;
        let start = f.clock.now();

        let rent = f
            .service
            .admin_create_rent(AdminRentRequest {
                transport_id: f.transport.id,
                user_id: f.renter.id,
                time_start: start,
                time_end: Some(start + Duration::minutes(10)),
                price_of_unit: 3.0,
                price_type: PriceType::Minutes,
                final_price: None,
            })
            .await
            .unwrap();
        assert_eq!(rent.final_price, Some(30.0));

        // A historical rent doesn't take the transport
        let transport = f.store.get_transport(f.transport.id).await.unwrap().unwrap();
        assert!(transport.can_be_rented);
    }

    #[tokio::test]
    async fn test_rent_rows_are_stamped_by_service_clock() {
        let f = fixture().await;
        let opened_at = f.clock.now();

        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();
        let stored = f.store.get_rent(rent.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, opened_at);
        assert_eq!(stored.updated_at, opened_at);

        f.clock.advance(Duration::minutes(5));
        f.service
            .admin_update_rent(
                rent.id,
                AdminRentUpdateRequest {
                    price_of_unit: Some(2.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stored = f.store.get_rent(rent.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, opened_at);
        assert_eq!(stored.updated_at, opened_at + Duration::minutes(5));

        f.clock.advance(Duration::minutes(5));
        f.service.end_rent(&f.renter, rent.id, 54.3, 48.4).await.unwrap();
        let stored = f.store.get_rent(rent.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, opened_at + Duration::minutes(10));

        // Backdated admin rents still carry the time they were recorded
        let historical = f
            .service
            .admin_create_rent(AdminRentRequest {
                transport_id: f.transport.id,
                user_id: f.renter.id,
                time_start: opened_at - Duration::days(3),
                time_end: Some(opened_at - Duration::days(2)),
                price_of_unit: 1.0,
                price_type: PriceType::Days,
                final_price: None,
            })
            .await
            .unwrap();
        let stored = f.store.get_rent(historical.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, f.clock.now());
    }

    #[tokio::test]
    async fn test_admin_create_rejects_end_before_start() {
        let f = fixture().await;
        let start = f.clock.now();

        let result = f
            .service
            .admin_create_rent(AdminRentRequest {
                transport_id: f.transport.id,
                user_id: f.renter.id,
                time_start: start,
                time_end: Some(start - Duration::minutes(1)),
                price_of_unit: 3.0,
                price_type: PriceType::Minutes,
                final_price: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_admin_update_and_delete() {
        let f = fixture().await;
        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();

        let updated = f
            .service
            .admin_update_rent(
                rent.id,
                AdminRentUpdateRequest {
                    price_of_unit: Some(1.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_of_unit, 1.0);
        assert!(updated.time_end.is_none());

        f.service.admin_delete_rent(rent.id).await.unwrap();
        let transport = f.store.get_transport(f.transport.id).await.unwrap().unwrap();
        assert!(transport.can_be_rented);

        let missing = f.service.admin_get_rent(rent.id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_end_any_rent() {
        let f = fixture().await;
        let rent = f
            .service
            .open_rent(&f.renter, f.transport.id, PriceType::Minutes)
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(2));

        let ended = f
            .service
            .admin_end_rent(rent.id, 54.0, 48.0)
            .await
            .unwrap();
        assert_eq!(ended.final_price, Some(10.0));
    }

    #[tokio::test]
    async fn test_admin_user_history_unknown_user() {
        let f = fixture().await;

        let result = f
            .service
            .admin_user_history(Uuid::new_v4(), Pagination::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
