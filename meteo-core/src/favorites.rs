//! Persistent list of favorite cities.
//!
//! The whole collection lives as one JSON array under a single key and is
//! rewritten on every change. Nothing here returns an error: storage
//! failures are logged and the caller sees an empty list or a negative answer.

use crate::{error::StorageError, model::FavoriteCity, storage::KeyValueStore};

pub const FAVORITES_KEY: &str = "weather_favorites";

#[derive(Debug, Clone)]
pub struct FavoritesStore<S> {
    store: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    async fn read(&self) -> Result<Vec<FavoriteCity>, StorageError> {
        match self.store.get(FAVORITES_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, favorites: &[FavoriteCity]) -> Result<(), StorageError> {
        let json = serde_json::to_string(favorites)?;
        self.store.set(FAVORITES_KEY, &json).await
    }

    /// All favorites in insertion order; empty when missing or unreadable.
    pub async fn list(&self) -> Vec<FavoriteCity> {
        match self.read().await {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Error loading favorites: {}", e);
                Vec::new()
            }
        }
    }

    /// Append `city` unless a favorite with the same name and country exists.
    ///
    /// Returns `true` only when the city was appended and written back.
    pub async fn add(&self, city: FavoriteCity) -> bool {
        let mut favorites = self.list().await;
        if favorites.iter().any(|fav| fav.same_city(&city)) {
            return false;
        }

        tracing::debug!("Adding favorite {}, {}", city.name, city.country);
        favorites.push(city);

        match self.write(&favorites).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Error adding favorite: {}", e);
                false
            }
        }
    }

    /// Remove every favorite called `name`, whatever its country.
    ///
    /// Returns how many entries were removed and written back.
    pub async fn remove(&self, name: &str) -> usize {
        let mut favorites = self.list().await;
        let before = favorites.len();
        favorites.retain(|fav| fav.name != name);

        let removed = before - favorites.len();
        if removed == 0 {
            return 0;
        }

        match self.write(&favorites).await {
            Ok(()) => removed,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Error removing favorite: {}", e);
                0
            }
        }
    }

    /// Whether any favorite is called `name`.
    pub async fn is_favorite(&self, name: &str) -> bool {
        match self.read().await {
            Ok(favorites) => favorites.iter().any(|fav| fav.name == name),
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Error checking favorite: {}", e);
                false
            }
        }
    }
}
