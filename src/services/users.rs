use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Input payload for creating a user
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Input payload for updating a user
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Service for managing user records. Passwords are stored as argon2 hashes.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a user with a hashed password.
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        let db = self.connection();

        if input.username.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "username must not be blank".to_string(),
            ));
        }
        if input.email.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "email must not be blank".to_string(),
            ));
        }
        if input.password.len() < 8 {
            return Err(ServiceError::ValidationError(
                "password must be at least 8 characters".to_string(),
            ));
        }

        self.ensure_unique(&input.username, &input.email, None).await?;

        let model = user::ActiveModel {
            id: Default::default(),
            username: Set(input.username.trim().to_string()),
            email: Set(input.email.trim().to_string()),
            password_hash: Set(hash_password(&input.password)?),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(db).await.map_err(ServiceError::db_error)?;

        info!("User created: id={}, username={}", created.id, created.username);

        self.event_sender
            .send_or_log(Event::UserCreated(created.id))
            .await;

        Ok(created)
    }

    /// Fetches a single user.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<Option<user::Model>, ServiceError> {
        UserEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Returns paginated users ordered by username.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let db = self.connection();
        let limit = limit.max(1);
        let page = page.max(1) - 1;

        let paginator = UserEntity::find()
            .order_by_asc(user::Column::Username)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Applies updates to a user; a supplied password is re-hashed.
    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        id: i64,
        input: UpdateUserInput,
    ) -> Result<user::Model, ServiceError> {
        let db = self.connection();

        let mut model = UserEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        if let Some(username) = &input.username {
            if username.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "username must not be blank".to_string(),
                ));
            }
        }
        if let Some(email) = &input.email {
            if email.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "email must not be blank".to_string(),
                ));
            }
        }

        self.ensure_unique(
            input.username.as_deref().unwrap_or(&model.username),
            input.email.as_deref().unwrap_or(&model.email),
            Some(id),
        )
        .await?;

        if let Some(username) = input.username {
            model.username = username.trim().to_string();
        }
        if let Some(email) = input.email {
            model.email = email.trim().to_string();
        }
        if let Some(password) = input.password {
            if password.len() < 8 {
                return Err(ServiceError::ValidationError(
                    "password must be at least 8 characters".to_string(),
                ));
            }
            model.password_hash = hash_password(&password)?;
        }

        let updated = model
            .into_active_model()
            .reset_all()
            .update(db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::UserUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Deletes a user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        let db = self.connection();

        let model = UserEntity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        model.delete(db).await.map_err(ServiceError::db_error)?;

        self.event_sender.send_or_log(Event::UserDeleted(id)).await;

        Ok(())
    }

    /// Checks a candidate password against a stored hash.
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ServiceError> {
        let parsed =
            PasswordHash::new(password_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<(), ServiceError> {
        let db = self.connection();

        let mut username_query = UserEntity::find().filter(user::Column::Username.eq(username));
        let mut email_query = UserEntity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude_id {
            username_query = username_query.filter(user::Column::Id.ne(id));
            email_query = email_query.filter(user::Column::Id.ne(id));
        }

        if username_query
            .count(db)
            .await
            .map_err(ServiceError::db_error)?
            > 0
        {
            return Err(ServiceError::ValidationError(format!(
                "username '{}' is already taken",
                username
            )));
        }
        if email_query.count(db).await.map_err(ServiceError::db_error)? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "email '{}' is already registered",
                email
            )));
        }

        Ok(())
    }

    fn connection(&self) -> &DatabaseConnection {
        self.db_pool.as_ref()
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}
