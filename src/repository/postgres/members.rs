//! Members repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{CreateMember, Member, MemberQuery},
    repository::MembershipStore,
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for MembersRepository {
    async fn get_member(&self, member_id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "SELECT member_id, name, email, phone_number, member_type FROM member WHERE member_id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", member_id)))
    }

    async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT member_id, name, email, phone_number, member_type FROM member
            WHERE ($1::TEXT IS NULL OR member_type = $1)
            ORDER BY member_id
            "#,
        )
        .bind(query.member_type.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn create_member(&self, member: &CreateMember) -> AppResult<Member> {
        let created = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO member (name, email, phone_number, member_type)
            VALUES ($1, $2, $3, $4)
            RETURNING member_id, name, email, phone_number, member_type
            "#,
        )
        .bind(member.name.trim())
        .bind(&member.email)
        .bind(&member.phone_number)
        .bind(&member.member_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::Validation("A member with this email already exists".to_string());
                }
            }
            AppError::from(e)
        })?;

        Ok(created)
    }

    async fn count_members(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM member")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
