//! The signed-in user's shipping address.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_core::Phone;
use strives_db::addresses::{Address, AddressFields};
use strives_db::{AddressRepository, RepositoryError};

use crate::error::{AppError, Result, ResultExt};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::auth::AuthError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    pub phone: String,
    #[validate(length(min = 1, message = "is required"))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "is required"))]
    pub state: String,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub pincode: String,
    pub landmark: Option<String>,
}

impl AddressRequest {
    fn into_fields(self) -> Result<AddressFields> {
        let phone = Phone::parse(&self.phone).map_err(AuthError::from)?;
        Ok(AddressFields {
            name: self.name.trim().to_owned(),
            phone,
            line1: self.line1,
            line2: self.line2.filter(|s| !s.trim().is_empty()),
            city: self.city,
            state: self.state,
            pincode: self.pincode,
            landmark: self.landmark.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[instrument(skip(state, req), fields(user_id = %user_id))]
pub async fn create_address(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<AddressRequest>,
) -> Result<ApiResponse<Address>> {
    let fields = req.into_fields()?;
    let address = match AddressRepository::new(state.pool())
        .create(user_id, &fields)
        .await
    {
        Ok(address) => address,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::BadRequest("Address already exists.".to_owned()));
        }
        Err(e) => return Err(e).or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error adding address"),
    };
    Ok(ApiResponse::data(address).with_message("Address added successfully"))
}

#[instrument(skip(state, req), fields(user_id = %user_id))]
pub async fn update_address(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<AddressRequest>,
) -> Result<ApiResponse<Address>> {
    let fields = req.into_fields()?;
    let address = match AddressRepository::new(state.pool())
        .update(user_id, &fields)
        .await
    {
        Ok(address) => address,
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound("Address Not Found".to_owned()));
        }
        Err(e) => {
            return Err(e).or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error updating address");
        }
    };
    Ok(ApiResponse::data(address).with_message("Address updated successfully"))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_address(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Address>> {
    let address = AddressRepository::new(state.pool())
        .get_for_user(user_id)
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching address")?
        .ok_or_else(|| AppError::NotFound("Address Not Found".to_owned()))?;
    Ok(ApiResponse::data(address))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(phone: &str) -> AddressRequest {
        AddressRequest {
            name: " Asha ".to_owned(),
            phone: phone.to_owned(),
            line1: "12 MG Road".to_owned(),
            line2: Some("  ".to_owned()),
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            pincode: "560001".to_owned(),
            landmark: None,
        }
    }

    #[test]
    fn test_into_fields_normalises() {
        let fields = request("98765 43210").into_fields().unwrap();
        assert_eq!(fields.name, "Asha");
        assert_eq!(fields.phone.as_str(), "+919876543210");
        assert_eq!(fields.line2, None);
    }

    #[test]
    fn test_into_fields_rejects_bad_phone() {
        assert!(request("123").into_fields().is_err());
    }

    #[test]
    fn test_pincode_length_validated() {
        let mut req = request("9876543210");
        req.pincode = "5600".to_owned();
        assert!(req.validate().is_err());
    }
}
