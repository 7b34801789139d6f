//! Wire and domain types shared by the Supabase client and the reconciler.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A legacy identifier. The legacy table stores either integers or strings,
/// and the JSON type is preserved in the mapping output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Int(i64),
    Text(String),
}

impl LegacyId {
    /// Whether this identifier carries no usable value: an empty string or 0.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Int(n) => *n == 0,
            Self::Text(s) => s.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy users
// ---------------------------------------------------------------------------

/// A row of the legacy `users` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyUser {
    #[serde(default)]
    pub id: Option<LegacyId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub legacy_user_id: Option<LegacyId>,
}

impl LegacyUser {
    /// The email used as join key, if non-empty.
    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }

    /// `legacy_user_id` when set, otherwise the row `id`.
    pub fn legacy_id(&self) -> Option<&LegacyId> {
        self.legacy_user_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .or_else(|| self.id.as_ref().filter(|id| !id.is_blank()))
    }

    /// Metadata to attach to a newly created auth account.
    pub fn auth_metadata(&self) -> UserMetadata {
        UserMetadata {
            full_name: non_empty(self.name.as_deref()).map(str::to_string),
            avatar_url: non_empty(self.image_url.as_deref())
                .or_else(|| non_empty(self.avatar_url.as_deref()))
                .map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth users
// ---------------------------------------------------------------------------

/// An account returned by the auth admin API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// The email used as join key, if non-empty.
    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }
}

/// One page of `GET /auth/v1/admin/users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthUserPage {
    #[serde(default)]
    pub users: Vec<AuthUser>,
}

/// Profile fields copied from the legacy row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Body of `POST /auth/v1/admin/users`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAuthUser {
    pub email: String,
    pub email_confirm: bool,
    pub user_metadata: UserMetadata,
}

impl NewAuthUser {
    /// A pre-confirmed account for `email`.
    pub fn confirmed(email: impl Into<String>, user_metadata: UserMetadata) -> Self {
        Self {
            email: email.into(),
            email_confirm: true,
            user_metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// One legacy-to-auth correspondence in the output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingEntry {
    pub legacy_id: LegacyId,
    pub auth_id: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_user_decodes_sparse_row() {
        let user: LegacyUser =
            serde_json::from_value(json!({ "id": 7, "email": null, "name": "Ann" })).unwrap();
        assert_eq!(user.id, Some(LegacyId::Int(7)));
        assert!(user.email().is_none());
        assert!(user.legacy_user_id.is_none());
    }

    #[test]
    fn test_legacy_id_prefers_explicit_legacy_user_id() {
        let user: LegacyUser = serde_json::from_value(json!({
            "id": "uuid-1", "legacy_user_id": "old-42"
        }))
        .unwrap();
        assert_eq!(user.legacy_id(), Some(&LegacyId::Text("old-42".into())));

        let user: LegacyUser =
            serde_json::from_value(json!({ "id": "uuid-1", "legacy_user_id": "" })).unwrap();
        assert_eq!(user.legacy_id(), Some(&LegacyId::Text("uuid-1".into())));

        let user = LegacyUser::default();
        assert!(user.legacy_id().is_none());
    }

    #[test]
    fn test_zero_legacy_id_counts_as_unset() {
        let user: LegacyUser =
            serde_json::from_value(json!({ "id": 5, "legacy_user_id": 0 })).unwrap();
        assert_eq!(user.legacy_id(), Some(&LegacyId::Int(5)));

        let user: LegacyUser = serde_json::from_value(json!({ "id": 0 })).unwrap();
        assert!(user.legacy_id().is_none());

        let user: LegacyUser =
            serde_json::from_value(json!({ "id": 0, "legacy_user_id": "0" })).unwrap();
        assert_eq!(user.legacy_id(), Some(&LegacyId::Text("0".into())));
    }

    #[test]
    fn test_metadata_only_includes_non_empty_fields() {
        let user = LegacyUser {
            name: Some(String::new()),
            image_url: Some(String::new()),
            avatar_url: Some("https://cdn/a.png".into()),
            ..Default::default()
        };
        let meta = user.auth_metadata();
        assert_eq!(meta.full_name, None);
        assert_eq!(meta.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({ "avatar_url": "https://cdn/a.png" })
        );

        let user = LegacyUser {
            name: Some("Ann".into()),
            image_url: Some("https://cdn/i.png".into()),
            avatar_url: Some("https://cdn/a.png".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(user.auth_metadata()).unwrap(),
            json!({ "full_name": "Ann", "avatar_url": "https://cdn/i.png" })
        );

        assert_eq!(
            serde_json::to_value(LegacyUser::default().auth_metadata()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_auth_user_requires_id() {
        assert!(serde_json::from_value::<AuthUser>(json!({ "email": "a@x.com" })).is_err());
        let user: AuthUser = serde_json::from_value(json!({ "id": "u1" })).unwrap();
        assert!(user.email().is_none());
    }

    #[test]
    fn test_new_auth_user_is_confirmed() {
        let body = NewAuthUser::confirmed("a@x.com", UserMetadata::default());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "email": "a@x.com", "email_confirm": true, "user_metadata": {} })
        );
    }

    #[test]
    fn test_mapping_entry_preserves_id_type() {
        let entry = MappingEntry {
            legacy_id: LegacyId::Int(12),
            auth_id: "abc".into(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({ "legacy_id": 12, "auth_id": "abc" })
        );
    }
}
