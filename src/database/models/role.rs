use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{cast_required_string, cast_string, now, Entity, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    pub id: Uuid,
    /// Display name, e.g. "Administrator"
    pub name: String,
    /// Stable code, e.g. "ADMIN"
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Role {
    const COLLECTION: &'static str = "roles";
    const UNIQUE: &'static [&'static str] = &["name", "code"];
}

/// Body of `POST /roles`
#[derive(Debug, Default, Deserialize)]
pub struct NewRole {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

impl NewRole {
    pub fn into_role(self) -> Result<Role, ModelError> {
        let name = required(self.name, "name")?;
        let code = required(self.code, "code")?;
        let created = Utc::now();
        Ok(Role {
            id: Uuid::nil(),
            name,
            code,
            description: self.description.unwrap_or_default(),
            created_at: created,
            updated_at: created,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ModelError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ModelError::Required(field.to_string()))
}

impl Role {
    pub fn prepare_update(patch: Map<String, Value>) -> Result<Map<String, Value>, ModelError> {
        let mut out = Map::new();
        for (field, value) in patch {
            match field.as_str() {
                "name" | "code" => {
                    let v = cast_required_string(&field, value)?;
                    out.insert(field, Value::String(v));
                }
                "description" => {
                    let v = match cast_string(&field, value)? {
                        Value::Null => Value::String(String::new()),
                        v => v,
                    };
                    out.insert(field, v);
                }
                _ => tracing::debug!("dropping unknown role field '{}'", field),
            }
        }
        out.insert("updatedAt".to_string(), Value::String(now()));
        Ok(out)
    }
}
