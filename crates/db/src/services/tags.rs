//! Tag bindings, including the atomic replace-or-insert.

use dockyard_core::error::CoreError;
use dockyard_core::tag_key::TagKey;
use dockyard_core::types::DbId;
use dockyard_core::validation::{validate_repository_path, validate_tag_name};

use crate::error::DbResult;
use crate::models::repository_tag::{CreateRepositoryTag, RepositoryTag, UpdateRepositoryTag};
use crate::repositories::RepositoryTagRepo;
use crate::storage::{Filter, Record, Storage};

pub struct TagService<'a> {
    storage: &'a Storage,
}

impl<'a> TagService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new binding. An existing binding for the same key is a
    /// uniqueness violation.
    ///
    /// Takes the same per-key lock as [`put_tag`](Self::put_tag), so a put
    /// racing this insert waits for it and then replaces the new row.
    #[tracing::instrument(skip(self, input), fields(key = %input.key()))]
    pub async fn insert_tag(&self, input: CreateRepositoryTag) -> DbResult<RepositoryTag> {
        let key = input.key();
        key.validate()?;

        let mut tx = self.storage.pool().begin().await?;
        RepositoryTagRepo::lock_key(&mut *tx, &key).await?;
        let tag = RepositoryTagRepo::create(&mut *tx, &input).await?;
        tx.commit().await?;

        tracing::info!(id = tag.id, "Tag created");
        Ok(tag)
    }

    /// Update binding `id` in place, guarded by `input.version`.
    ///
    /// Holds the row lock for the whole write. When the key changes, the
    /// per-key lock of the destination key is taken as well so the move
    /// cannot interleave with a put on that key.
    #[tracing::instrument(skip(self, input), fields(version = input.version))]
    pub async fn update_tag(&self, id: DbId, input: &UpdateRepositoryTag) -> DbResult<RepositoryTag> {
        if let Some(namespace) = &input.namespace {
            validate_repository_path("namespace", namespace)?;
        }
        if let Some(repository) = &input.repository {
            validate_repository_path("repository", repository)?;
        }
        if let Some(tag_name) = &input.tag_name {
            validate_tag_name(tag_name)?;
        }

        let mut tx = self.storage.pool().begin().await?;

        let current = RepositoryTagRepo::lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(RepositoryTag::ENTITY, id))?;
        if current.version != input.version {
            tracing::warn!(stored = current.version, "Stale tag version");
            return Err(CoreError::stale_version(RepositoryTag::ENTITY, id).into());
        }

        let from = current.key();
        let to = TagKey::new(
            input.namespace.as_deref().unwrap_or(&from.namespace),
            input.repository.as_deref().unwrap_or(&from.repository),
            input.tag_name.as_deref().unwrap_or(&from.tag_name),
        );
        if to != from {
            RepositoryTagRepo::lock_key(&mut *tx, &to).await?;
        }

        let updated = RepositoryTagRepo::update(&mut *tx, id, input)
            .await?
            .ok_or_else(|| CoreError::stale_version(RepositoryTag::ENTITY, id))?;
        tx.commit().await?;

        if to != from {
            tracing::info!(%from, %to, "Tag moved");
        }
        Ok(updated)
    }

    /// Point a tag at a new manifest, replacing any existing binding.
    ///
    /// Lock, delete, and insert share one transaction serialised on a
    /// per-key advisory lock, so concurrent puts for the same key leave
    /// exactly one row: the last writer's. The replacement is a fresh row
    /// with a new id, timestamps, and version 1.
    #[tracing::instrument(skip(self, input), fields(key = %input.key()))]
    pub async fn put_tag(&self, input: CreateRepositoryTag) -> DbResult<RepositoryTag> {
        let key = input.key();
        key.validate()?;

        let mut tx = self.storage.pool().begin().await?;
        RepositoryTagRepo::lock_key(&mut *tx, &key).await?;
        let replaced = RepositoryTagRepo::delete_by_key(&mut *tx, &key).await?;
        let tag = RepositoryTagRepo::create(&mut *tx, &input).await?;
        tx.commit().await?;

        tracing::info!(id = tag.id, replaced = replaced > 0, "Tag bound");
        Ok(tag)
    }

    /// Find the binding for `key`, if any.
    pub async fn find_tag(&self, key: &TagKey) -> DbResult<Option<RepositoryTag>> {
        let filter = Filter::new()
            .eq("namespace", key.namespace.as_str())
            .eq("repository", key.repository.as_str())
            .eq("tag_name", key.tag_name.as_str());
        self.storage.find_one_by::<RepositoryTag>(&filter).await
    }

    /// List every tag of a repository, ordered by tag name.
    pub async fn list_tags(&self, namespace: &str, repository: &str) -> DbResult<Vec<RepositoryTag>> {
        let filter = Filter::new()
            .eq("namespace", namespace)
            .eq("repository", repository)
            .order_by("tag_name");
        self.storage.find_many_by::<RepositoryTag>(&filter).await
    }
}
