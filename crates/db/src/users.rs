use cp_domain::types::{Role, User};
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: parse_role(&row.role),
        }
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "business_admin" => Role::BusinessAdmin,
        "dev_admin" => Role::DevAdmin,
        _ => Role::User,
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::BusinessAdmin => "business_admin",
        Role::DevAdmin => "dev_admin",
    }
}

pub struct UserStore {
    db: Db,
}

impl UserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, email: &str, display_name: &str, role: Role) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (email, display_name, role) VALUES ($1, $2, $3)
             RETURNING id, email, display_name, role",
        )
        .bind(email)
        .bind(display_name)
        .bind(role_str(role))
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        let row: UserRow =
            sqlx::query_as("SELECT id, email, display_name, role FROM users WHERE id = $1")
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, display_name, role FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, display_name, role FROM users ORDER BY created_at")
                .fetch_all(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<()> {
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role_str(role))
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
