/// PostgreSQL store implementation
///
/// One [`PgStores`] value implements every adapter trait in [`crate::store`]
/// on top of a sqlx connection pool. Uniqueness and referential guards are
/// real database constraints, so the duplicate-membership check is atomic
/// even under concurrent inserts.
///
/// # Error Mapping
///
/// - unique violation (23505) → [`Error::AlreadyExists`]
/// - foreign-key violation (23503) → [`Error::ReferenceNotFound`]
/// - empty singular result → [`Error::ResourceNotFound`]
/// - anything else → [`Error::Infrastructure`] (retryable)
///
/// # Example
///
/// ```no_run
/// use labelbase_core::store::postgres::{create_pool, run_migrations, PgStores};
///
/// # async fn example() -> labelbase_core::Result<()> {
/// let pool = create_pool("postgresql://localhost/labelbase", 10).await?;
/// run_migrations(&pool).await?;
/// let stores = PgStores::stores(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::models::{
    CreateDataset, CreateImage, CreateImageObject, CreateObjectPoint, CreateProject, CreateUser,
    Dataset, DatasetMembership, Image, ImageObject, ImagePayload, ObjectPoint, Project,
    ProjectMembership, UpdateDataset, UpdateImageObject, UpdateProject, UpdateUser, User,
};
use crate::roles::{DatasetRole, ProjectRole};
use crate::store::{
    BlobStore, DatasetMembershipStore, DatasetStore, ImageObjectStore, ImageStore,
    ObjectPointStore, ProjectMembershipStore, ProjectStore, Stores, UserStore,
};

/// Creates a PostgreSQL connection pool
///
/// The pool keeps a couple of warm connections and tests each one before
/// handing it out, the same settings used across the deployment.
pub async fn create_pool(url: &str, max_connections: u32) -> Result<PgPool> {
    info!(max_connections, "creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Some(Duration::from_secs(600)))
        .max_lifetime(Some(Duration::from_secs(1800)))
        .test_before_acquire(true)
        .connect(url)
        .await
        .map_err(infra)?;

    // Verify connectivity before declaring the pool healthy
    sqlx::query("SELECT 1").execute(&pool).await.map_err(infra)?;

    Ok(pool)
}

/// Creates the schema if it does not exist yet
///
/// Every statement is idempotent, so this runs unconditionally at startup.
/// `images.dataset_id` carries no foreign key on purpose: the lenient
/// dataset-deletion sweep may leave images that still own objects behind.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("running database migrations");

    const STATEMENTS: &[&str] = &[
        r#"
        DO $$ BEGIN
            CREATE TYPE system_role AS ENUM ('user', 'admin', 'researcher');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
        r#"
        DO $$ BEGIN
            CREATE TYPE project_role AS ENUM ('owner', 'dataset_editor');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
        r#"
        DO $$ BEGIN
            CREATE TYPE dataset_role AS ENUM ('owner', 'labeler', 'viewer');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username VARCHAR(255) NOT NULL UNIQUE,
            email VARCHAR(255) NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            system_role system_role NOT NULL DEFAULT 'user',
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            owner_id UUID NOT NULL REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS project_memberships (
            project_id UUID NOT NULL REFERENCES projects(id),
            user_id UUID NOT NULL REFERENCES users(id),
            role project_role NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (project_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL REFERENCES projects(id),
            owner_id UUID NOT NULL REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS dataset_memberships (
            dataset_id UUID NOT NULL REFERENCES datasets(id),
            user_id UUID NOT NULL REFERENCES users(id),
            role dataset_role NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (dataset_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            format VARCHAR(32) NOT NULL,
            dataset_id UUID NOT NULL,
            categories TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS images_dataset_id_idx ON images(dataset_id)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS image_objects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            image_id UUID NOT NULL REFERENCES images(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS object_points (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            image_object_id UUID NOT NULL REFERENCES image_objects(id),
            x DOUBLE PRECISION NOT NULL,
            y DOUBLE PRECISION NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS image_blobs (
            image_id UUID PRIMARY KEY,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            data BYTEA NOT NULL
        )
        "#,
    ];

    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await.map_err(infra)?;
    }

    info!("database migrations completed");
    Ok(())
}

fn infra(e: sqlx::Error) -> Error {
    Error::Infrastructure(e.to_string())
}

/// Maps constraint violations on writes; `reference` names the foreign
/// entity a 23503 most plausibly points at (callers validate foreign ids
/// up front, so this path is rare).
fn map_write_err(e: sqlx::Error, reference: ResourceKind) -> Error {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23505") => return Error::AlreadyExists,
            Some("23503") => return Error::ReferenceNotFound(reference),
            _ => {}
        }
    }
    infra(e)
}

/// PostgreSQL implementation of every store adapter
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        PgStores { pool }
    }

    /// Builds a [`Stores`] bundle backed by one shared pool
    pub fn stores(pool: PgPool) -> Stores {
        let shared = Arc::new(PgStores::new(pool));
        Stores {
            users: shared.clone(),
            projects: shared.clone(),
            datasets: shared.clone(),
            images: shared.clone(),
            image_objects: shared.clone(),
            object_points: shared.clone(),
            project_members: shared.clone(),
            dataset_members: shared.clone(),
            blobs: shared,
        }
    }
}

#[async_trait]
impl UserStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn list(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(infra)
    }

    async fn insert(&self, input: CreateUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, system_role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.username)
        .bind(input.email)
        .bind(input.password_hash)
        .bind(input.system_role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::User))
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                system_role = COALESCE($5, system_role),
                active = COALESCE($6, active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.username)
        .bind(input.email)
        .bind(input.password_hash)
        .bind(input.system_role)
        .bind(input.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::User))?
        .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn delete(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }
}

#[async_trait]
impl ProjectStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Project> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Project))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(infra)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE owner_id = $1 ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, input: CreateProject) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, owner_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(input.name)
        .bind(input.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::User))
    }

    async fn update(&self, id: Uuid, input: UpdateProject) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                owner_id = COALESCE($3, owner_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::User))?
        .ok_or(Error::ResourceNotFound(ResourceKind::Project))
    }

    async fn delete(&self, id: Uuid) -> Result<Project> {
        sqlx::query_as::<_, Project>("DELETE FROM projects WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Project))
    }
}

#[async_trait]
impl DatasetStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Dataset> {
        sqlx::query_as::<_, Dataset>("SELECT * FROM datasets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))
    }

    async fn list(&self) -> Result<Vec<Dataset>> {
        sqlx::query_as::<_, Dataset>("SELECT * FROM datasets ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(infra)
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Dataset>> {
        sqlx::query_as::<_, Dataset>(
            "SELECT * FROM datasets WHERE project_id = $1 ORDER BY created_at ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Dataset>> {
        sqlx::query_as::<_, Dataset>(
            "SELECT * FROM datasets WHERE owner_id = $1 ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<Dataset>> {
        sqlx::query_as::<_, Dataset>(
            "SELECT * FROM datasets WHERE name = $1 ORDER BY created_at ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, input: CreateDataset) -> Result<Dataset> {
        sqlx::query_as::<_, Dataset>(
            r#"
            INSERT INTO datasets (name, project_id, owner_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(input.name)
        .bind(input.project_id)
        .bind(input.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Project))
    }

    async fn update(&self, id: Uuid, input: UpdateDataset) -> Result<Dataset> {
        sqlx::query_as::<_, Dataset>(
            r#"
            UPDATE datasets
            SET name = COALESCE($2, name),
                project_id = COALESCE($3, project_id),
                owner_id = COALESCE($4, owner_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.project_id)
        .bind(input.owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Project))?
        .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))
    }

    async fn delete(&self, id: Uuid) -> Result<Dataset> {
        sqlx::query_as::<_, Dataset>("DELETE FROM datasets WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))
    }
}

#[async_trait]
impl ImageStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Image> {
        sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Image))
    }

    async fn list_by_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>> {
        sqlx::query_as::<_, Image>(
            "SELECT * FROM images WHERE dataset_id = $1 ORDER BY created_at ASC",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn list_by_categories(
        &self,
        categories: &[String],
        dataset_id: Option<Uuid>,
    ) -> Result<Vec<Image>> {
        sqlx::query_as::<_, Image>(
            r#"
            SELECT * FROM images
            WHERE categories @> $1
              AND ($2::uuid IS NULL OR dataset_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(categories)
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, input: CreateImage) -> Result<Image> {
        sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (name, format, dataset_id, categories)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.name)
        .bind(input.format)
        .bind(input.dataset_id)
        .bind(input.categories)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Dataset))
    }

    async fn delete(&self, id: Uuid) -> Result<Image> {
        sqlx::query_as::<_, Image>("DELETE FROM images WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::Image))
    }
}

#[async_trait]
impl ImageObjectStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<ImageObject> {
        sqlx::query_as::<_, ImageObject>("SELECT * FROM image_objects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))
    }

    async fn list_by_image(&self, image_id: Uuid) -> Result<Vec<ImageObject>> {
        sqlx::query_as::<_, ImageObject>("SELECT * FROM image_objects WHERE image_id = $1")
            .bind(image_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)
    }

    async fn insert(&self, input: CreateImageObject) -> Result<ImageObject> {
        sqlx::query_as::<_, ImageObject>(
            r#"
            INSERT INTO image_objects (name, image_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(input.name)
        .bind(input.image_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Image))
    }

    async fn update(&self, id: Uuid, input: UpdateImageObject) -> Result<ImageObject> {
        sqlx::query_as::<_, ImageObject>(
            r#"
            UPDATE image_objects
            SET name = COALESCE($2, name),
                image_id = COALESCE($3, image_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.image_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Image))?
        .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))
    }

    async fn delete(&self, id: Uuid) -> Result<ImageObject> {
        sqlx::query_as::<_, ImageObject>("DELETE FROM image_objects WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))
    }
}

#[async_trait]
impl ObjectPointStore for PgStores {
    async fn find_by_id(&self, id: Uuid) -> Result<ObjectPoint> {
        sqlx::query_as::<_, ObjectPoint>("SELECT * FROM object_points WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::ObjectPoint))
    }

    async fn list_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>> {
        sqlx::query_as::<_, ObjectPoint>(
            "SELECT * FROM object_points WHERE image_object_id = $1",
        )
        .bind(image_object_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, input: CreateObjectPoint) -> Result<ObjectPoint> {
        sqlx::query_as::<_, ObjectPoint>(
            r#"
            INSERT INTO object_points (image_object_id, x, y)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(input.image_object_id)
        .bind(input.x)
        .bind(input.y)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::ImageObject))
    }

    async fn delete(&self, id: Uuid) -> Result<ObjectPoint> {
        sqlx::query_as::<_, ObjectPoint>("DELETE FROM object_points WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(Error::ResourceNotFound(ResourceKind::ObjectPoint))
    }

    async fn delete_all_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>> {
        sqlx::query_as::<_, ObjectPoint>(
            "DELETE FROM object_points WHERE image_object_id = $1 RETURNING *",
        )
        .bind(image_object_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }
}

#[async_trait]
impl ProjectMembershipStore for PgStores {
    async fn find(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership> {
        sqlx::query_as::<_, ProjectMembership>(
            "SELECT * FROM project_memberships WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>> {
        sqlx::query_as::<_, ProjectMembership>(
            r#"
            SELECT * FROM project_memberships
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProjectMembership>> {
        sqlx::query_as::<_, ProjectMembership>(
            r#"
            SELECT * FROM project_memberships
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, membership: ProjectMembership) -> Result<ProjectMembership> {
        sqlx::query_as::<_, ProjectMembership>(
            r#"
            INSERT INTO project_memberships (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(membership.project_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Project))
    }

    async fn update_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMembership> {
        let existing = ProjectMembershipStore::find(self, project_id, user_id).await?;
        if existing.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        sqlx::query_as::<_, ProjectMembership>(
            r#"
            UPDATE project_memberships
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn delete(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership> {
        let existing = ProjectMembershipStore::find(self, project_id, user_id).await?;
        if existing.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        sqlx::query_as::<_, ProjectMembership>(
            r#"
            DELETE FROM project_memberships
            WHERE project_id = $1 AND user_id = $2 AND role <> 'owner'
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn delete_all_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>> {
        sqlx::query_as::<_, ProjectMembership>(
            "DELETE FROM project_memberships WHERE project_id = $1 RETURNING *",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }
}

#[async_trait]
impl DatasetMembershipStore for PgStores {
    async fn find(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership> {
        sqlx::query_as::<_, DatasetMembership>(
            "SELECT * FROM dataset_memberships WHERE dataset_id = $1 AND user_id = $2",
        )
        .bind(dataset_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn list_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>> {
        sqlx::query_as::<_, DatasetMembership>(
            r#"
            SELECT * FROM dataset_memberships
            WHERE dataset_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DatasetMembership>> {
        sqlx::query_as::<_, DatasetMembership>(
            r#"
            SELECT * FROM dataset_memberships
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }

    async fn insert(&self, membership: DatasetMembership) -> Result<DatasetMembership> {
        sqlx::query_as::<_, DatasetMembership>(
            r#"
            INSERT INTO dataset_memberships (dataset_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(membership.dataset_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, ResourceKind::Dataset))
    }

    async fn update_role(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
        role: DatasetRole,
    ) -> Result<DatasetMembership> {
        let existing = DatasetMembershipStore::find(self, dataset_id, user_id).await?;
        if existing.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        sqlx::query_as::<_, DatasetMembership>(
            r#"
            UPDATE dataset_memberships
            SET role = $3
            WHERE dataset_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(dataset_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn delete(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership> {
        let existing = DatasetMembershipStore::find(self, dataset_id, user_id).await?;
        if existing.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        sqlx::query_as::<_, DatasetMembership>(
            r#"
            DELETE FROM dataset_memberships
            WHERE dataset_id = $1 AND user_id = $2 AND role <> 'owner'
            RETURNING *
            "#,
        )
        .bind(dataset_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn delete_all_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>> {
        sqlx::query_as::<_, DatasetMembership>(
            "DELETE FROM dataset_memberships WHERE dataset_id = $1 RETURNING *",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)
    }
}

#[async_trait]
impl BlobStore for PgStores {
    async fn put(&self, image_id: Uuid, payload: ImagePayload) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO image_blobs (image_id, filename, content_type, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (image_id) DO UPDATE
            SET filename = EXCLUDED.filename,
                content_type = EXCLUDED.content_type,
                data = EXCLUDED.data
            "#,
        )
        .bind(image_id)
        .bind(payload.filename)
        .bind(payload.content_type)
        .bind(payload.bytes.to_vec())
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn get(&self, image_id: Uuid) -> Result<Option<ImagePayload>> {
        let row = sqlx::query_as::<_, (String, String, Vec<u8>)>(
            "SELECT filename, content_type, data FROM image_blobs WHERE image_id = $1",
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;

        Ok(row.map(|(filename, content_type, data)| ImagePayload {
            filename,
            content_type,
            bytes: Bytes::from(data),
        }))
    }

    async fn delete(&self, image_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM image_blobs WHERE image_id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(())
    }
}
