//! Member model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Member model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub member_id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub member_type: String,
}

/// Create member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Ten digit phone number
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: Option<String>,
    /// e.g. "student", "faculty", "staff"
    #[validate(length(min = 1, max = 7, message = "Member type must be 1-7 characters"))]
    pub member_type: String,
}

impl CreateMember {
    /// Blank contact fields mean "not given"
    pub fn normalized(mut self) -> Self {
        self.email = self.email.filter(|e| !e.trim().is_empty());
        self.phone_number = self.phone_number.filter(|p| !p.trim().is_empty());
        self
    }
}

/// Member list filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    /// Exact member type, e.g. "student"
    pub member_type: Option<String>,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if !(1..=100).contains(&len) {
        let mut err = ValidationError::new("name");
        err.message = Some("Name must be 1-100 characters".into());
        return Err(err);
    }
    Ok(())
}

fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("phone_number");
        err.message = Some("Phone number must be exactly 10 digits".into());
        return Err(err);
    }
    Ok(())
}
