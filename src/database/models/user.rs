use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{cast_required_string, cast_string, now, Entity, ModelError};

/// Account record. The password is stored as given; hashing is not part of
/// this service and responses only ever carry [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub avatar: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    /// Weak reference to a [`super::Role`]; not checked for existence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const UNIQUE: &'static [&'static str] = &["username"];
}

/// Optional profile fields that default to an empty string
const PROFILE_FIELDS: &[&str] = &[
    "avatar",
    "realName",
    "contact",
    "idNumber",
    "address",
    "department",
    "position",
];

/// Body of `POST /users`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub avatar: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub real_name: Option<String>,
    pub contact: Option<String>,
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Uuid>,
}

impl NewUser {
    pub fn into_user(self) -> Result<User, ModelError> {
        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ModelError::Required("username".into()))?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ModelError::Required("password".into()))?;

        let created = Utc::now();
        Ok(User {
            id: Uuid::nil(),
            avatar: self.avatar.unwrap_or_default(),
            username,
            password,
            real_name: self.real_name.unwrap_or_default(),
            contact: self.contact.unwrap_or_default(),
            id_number: self.id_number.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            position: self.position.unwrap_or_default(),
            role: self.role,
            created_at: created,
            updated_at: created,
        })
    }
}

/// Body of `POST /users/login`
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
}

impl User {
    /// Validate a partial update. Unknown fields are dropped and `updatedAt`
    /// is refreshed.
    pub fn prepare_update(patch: Map<String, Value>) -> Result<Map<String, Value>, ModelError> {
        let mut out = Map::new();
        for (field, value) in patch {
            match field.as_str() {
                "username" => {
                    let username = cast_required_string(&field, value)?;
                    out.insert(field, Value::String(username));
                }
                "password" => match cast_string(&field, value)? {
                    Value::String(p) if !p.is_empty() => {
                        out.insert(field, Value::String(p));
                    }
                    _ => return Err(ModelError::Required(field)),
                },
                "role" => {
                    let role = match value {
                        Value::Null => Value::Null,
                        Value::String(s) => match Uuid::parse_str(&s) {
                            Ok(id) => Value::String(id.to_string()),
                            Err(_) => return Err(ModelError::InvalidId { field, value: s }),
                        },
                        other => {
                            return Err(ModelError::InvalidId { field, value: other.to_string() })
                        }
                    };
                    out.insert(field, role);
                }
                f if PROFILE_FIELDS.contains(&f) => {
                    let value = match cast_string(&field, value)? {
                        Value::Null => Value::String(String::new()),
                        v => v,
                    };
                    out.insert(field, value);
                }
                _ => tracing::debug!("dropping unknown user field '{}'", field),
            }
        }
        out.insert("updatedAt".to_string(), Value::String(now()));
        Ok(out)
    }
}

/// User as returned to clients: everything except the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub avatar: String,
    pub username: String,
    pub real_name: String,
    pub contact: String,
    pub id_number: String,
    pub address: String,
    pub department: String,
    pub position: String,
    pub role: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            avatar: user.avatar,
            username: user.username,
            real_name: user.real_name,
            contact: user.contact,
            id_number: user.id_number,
            address: user.address,
            department: user.department,
            position: user.position,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
