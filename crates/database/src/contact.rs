//! Trusted contact directory.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::TrustedContact;
use crate::validation::{validate_email, validate_phone};
use crate::Result;

/// Add a trusted contact for a user.
pub async fn add_contact(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    phone: &str,
    email: Option<&str>,
) -> Result<TrustedContact> {
    validate_phone(phone)?;
    if let Some(email) = email {
        validate_email(email)?;
    }

    let contact = TrustedContact {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        phone: phone.trim().to_string(),
        email: email.map(str::to_string),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO trusted_contacts (id, user_id, name, phone, email, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&contact.id)
    .bind(&contact.user_id)
    .bind(&contact.name)
    .bind(&contact.phone)
    .bind(&contact.email)
    .bind(contact.created_at)
    .execute(pool)
    .await?;

    Ok(contact)
}

/// List a user's trusted contacts in the order they were added.
pub async fn list_contacts(pool: &SqlitePool, user_id: &str) -> Result<Vec<TrustedContact>> {
    let contacts = sqlx::query_as::<_, TrustedContact>(
        r#"
        SELECT id, user_id, name, phone, email, created_at
        FROM trusted_contacts
        WHERE user_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}
