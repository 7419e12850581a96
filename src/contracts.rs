//! Request and response shapes crossing the HTTP boundary.
//!
//! Inbound payloads are validated into the entity-model inputs in
//! [`crate::models`]; outbound shapes are built from stored entities and never
//! serialize the storage structs directly.

use std::fmt;

use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Item, ItemChanges, ItemWithOwner, NewItem, NewUser, User, UserChanges, UserWithItems,
};

pub const MAX_NAME_LEN: usize = 20;
pub const MAX_EMAIL_LEN: usize = 30;
pub const MAX_TITLE_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is blank
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Field is present but not in the expected shape
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Body or path could not be decoded at all
    Malformed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} cannot be empty"),
            Self::TooLong { field, max } => {
                write!(f, "{field} exceeds maximum length of {max} characters")
            }
            Self::InvalidFormat { field, reason } => write!(f, "{field}: {reason}"),
            Self::Malformed(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ValidationError {}

fn text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    // VARCHAR(n) counts characters, not bytes
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn optional_text(
    field: &'static str,
    value: Option<&String>,
    max: usize,
) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |value| text(field, value, max))
}

fn invalid_email() -> ValidationError {
    ValidationError::InvalidFormat {
        field: "email",
        reason: "must be a valid email address",
    }
}

/// Run the derived garde rules; only `email` carries a format rule.
fn email_format<T>(request: &T, email: Option<&str>) -> Result<(), ValidationError>
where
    T: Validate<Context = ()>,
{
    if let Err(report) = request.validate() {
        tracing::debug!(%report, "email rejected");
        return Err(invalid_email());
    }
    // garde accepts single-label domains such as `a@b`
    if !email.is_none_or(has_dotted_domain) {
        return Err(invalid_email());
    }
    Ok(())
}

fn has_dotted_domain(email: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() > 1
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// Empty strings in a partial update mean "leave unchanged".
fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[garde(skip)]
    pub name: String,
    #[garde(email, length(chars, max = MAX_EMAIL_LEN))]
    pub email: String,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        text("name", &self.name, MAX_NAME_LEN)?;
        text("email", &self.email, MAX_EMAIL_LEN)?;
        email_format(&self, Some(self.email.as_str()))?;

        Ok(NewUser {
            name: self.name,
            email: self.email,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[garde(skip)]
    pub name: Option<String>,
    #[garde(email, length(chars, max = MAX_EMAIL_LEN))]
    pub email: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserChanges, ValidationError> {
        let request = Self {
            name: present(self.name),
            email: present(self.email),
        };
        optional_text("name", request.name.as_ref(), MAX_NAME_LEN)?;
        optional_text("email", request.email.as_ref(), MAX_EMAIL_LEN)?;
        email_format(&request, request.email.as_deref())?;

        Ok(UserChanges {
            name: request.name,
            email: request.email,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
}

impl CreateItemRequest {
    pub fn validate(self) -> Result<NewItem, ValidationError> {
        text("title", &self.title, MAX_TITLE_LEN)?;
        text("description", &self.description, MAX_DESCRIPTION_LEN)?;

        Ok(NewItem {
            title: self.title,
            description: self.description,
            owner_id: self.owner_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl UpdateItemRequest {
    pub fn validate(self) -> Result<ItemChanges, ValidationError> {
        let title = present(self.title);
        let description = present(self.description);
        optional_text("title", title.as_ref(), MAX_TITLE_LEN)?;
        optional_text("description", description.as_ref(), MAX_DESCRIPTION_LEN)?;

        Ok(ItemChanges {
            title,
            description,
            owner_id: self.owner_id,
        })
    }
}

/// Body of `POST /users/`. Only the name is echoed back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateUserResponse {
    pub name: String,
}

impl From<User> for CreateUserResponse {
    fn from(user: User) -> Self {
        Self { name: user.name }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            owner_id: item.owner_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserWithItemsResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub items: Vec<ItemResponse>,
}

impl From<UserWithItems> for UserWithItemsResponse {
    fn from(value: UserWithItems) -> Self {
        Self {
            user: value.user.into(),
            items: value.items.into_iter().map(ItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemWithOwnerResponse {
    #[serde(flatten)]
    pub item: ItemResponse,
    pub owner: UserResponse,
}

impl From<ItemWithOwner> for ItemWithOwnerResponse {
    fn from(value: ItemWithOwner) -> Self {
        Self {
            item: value.item.into(),
            owner: value.owner.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}
