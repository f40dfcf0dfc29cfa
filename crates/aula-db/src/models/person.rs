//! Person model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A person registered on the source platform.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Person {
    /// Source-platform key.
    pub id: i64,

    /// Login name, shared with the LMS account.
    pub username: String,

    /// Password hash, passed through to the LMS verbatim (both platforms
    /// use the same hashing scheme).
    pub password_hash: String,

    /// First name.
    pub first_name: String,

    /// First surname.
    pub last_name: String,

    /// Second surname; may be empty.
    pub second_last_name: String,

    /// Contact email.
    pub email: String,

    /// Linked LMS account, NULL until synced.
    pub lms_id: Option<i64>,
}

impl Person {
    /// People without an LMS account link.
    pub async fn list_unlinked(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT id, username, password_hash, first_name, last_name,
                   second_last_name, email, lms_id
            FROM persons
            WHERE lms_id IS NULL
            ORDER BY id
            ",
        )
        .fetch_all(pool)
        .await
    }

    /// Persists the LMS account link for a person.
    pub async fn set_lms_link(
        pool: &sqlx::PgPool,
        id: i64,
        lms_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE persons
            SET lms_id = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(lms_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Both surnames joined the way the LMS stores its last name.
    #[must_use]
    pub fn full_last_name(&self) -> String {
        if self.second_last_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{} {}", self.last_name, self.second_last_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(last: &str, second: &str) -> Person {
        Person {
            id: 1,
            username: "mgarcia".to_string(),
            password_hash: "$2y$10$abc".to_string(),
            first_name: "María".to_string(),
            last_name: last.to_string(),
            second_last_name: second.to_string(),
            email: "mgarcia@example.org".to_string(),
            lms_id: None,
        }
    }

    #[test]
    fn test_full_last_name_joins_surnames() {
        assert_eq!(person("García", "López").full_last_name(), "García López");
    }

    #[test]
    fn test_full_last_name_single_surname() {
        assert_eq!(person("García", "").full_last_name(), "García");
    }
}
