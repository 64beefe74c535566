//! Offline audio store.
//!
//! A deterministic, file-backed, content-addressable cache of pre-rendered
//! audio variants. Routes are composed from station, command, command weight
//! and the game-state route suffix; each route owns a folder of numbered
//! `.mp3` variants. Writes are append-only: a new variant always lands on
//! the next unused index, never on top of an existing file.

use std::path::{Path, PathBuf};

use futures_util::future::try_join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skywave_domain::{Command, CommandKind, GameContext, RadioContent, Station};

pub const AUDIO_FILE_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The route has no folder or no cached variants.
    #[error("route not cached: {0}")]
    Miss(String),
    #[error("store io error: {0}")]
    Io(String),
}

/// File-backed audio variant store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compose the cache route for a command at a station under the current
    /// game state: `<station>/<kind>$<weight><state-suffix>`, lowercased,
    /// spaces to underscores. The state suffix only participates when the
    /// command asks for state context.
    pub fn route_for(station: &Station, command: &Command, ctx: &GameContext) -> String {
        let suffix = if command.context_slice.value_kinds.is_empty() {
            String::new()
        } else {
            ctx.render_route(0)
        };
        Self::route(
            station.name(),
            command.kind,
            station.command_weight(command.kind),
            &suffix,
        )
    }

    /// Raw route assembly from its four parts.
    pub fn route(station_name: &str, kind: CommandKind, weight: f32, state_suffix: &str) -> String {
        format!(
            "{}/{}${weight}{state_suffix}",
            station_name.to_lowercase().replace(' ', "_"),
            kind.as_route()
        )
    }

    pub fn folder_path(&self, route: &str) -> PathBuf {
        self.root.join(route)
    }

    pub fn file_path(&self, route: &str, index: usize) -> PathBuf {
        self.folder_path(route).join(format!(
            "{}-{index}.{AUDIO_FILE_EXTENSION}",
            route.replace('/', "-")
        ))
    }

    /// Answer a query from the cache: pick one variant per required section
    /// uniformly at random (sections may repeat a variant) and read them
    /// concurrently. Fails with a miss when the route folder is absent or
    /// empty.
    pub async fn query(&self, route: &str, sections: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        let folder = self.folder_path(route);
        if tokio::fs::metadata(&folder).await.is_err() {
            return Err(StoreError::Miss(route.to_string()));
        }

        let variants = self.variant_files(&folder).await?;
        if variants.is_empty() {
            return Err(StoreError::Miss(route.to_string()));
        }

        // Draw before the reads so the future stays Send.
        let picks: Vec<PathBuf> = {
            let mut rng = StdRng::from_entropy();
            (0..sections)
                .map(|_| variants[rng.gen_range(0..variants.len())].clone())
                .collect()
        };

        try_join_all(picks.into_iter().map(tokio::fs::read))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Write a result's audio into the route folder, creating it if absent.
    /// With `split_sections` every section becomes its own numbered variant;
    /// otherwise the single concatenated buffer is written. Numbering always
    /// continues after the highest existing variant.
    pub async fn write(
        &self,
        route: &str,
        content: &RadioContent,
        split_sections: bool,
    ) -> Result<(), StoreError> {
        let folder = self.folder_path(route);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let mut index = 0usize;
        if split_sections {
            for section in content.audio_sections().iter().flatten() {
                index = self.next_free_index(route, index).await?;
                tokio::fs::write(self.file_path(route, index), section)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
            }
        } else {
            index = self.next_free_index(route, index).await?;
            tokio::fs::write(self.file_path(route, index), content.concat_audio())
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        Ok(())
    }

    async fn next_free_index(&self, route: &str, mut index: usize) -> Result<usize, StoreError> {
        loop {
            let exists = tokio::fs::try_exists(self.file_path(route, index))
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if !exists {
                return Ok(index);
            }
            index += 1;
        }
    }

    /// All cached variant files in a route folder. Index gaps are fine; a
    /// query draws among whatever variants actually exist.
    async fn variant_files(&self, folder: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = tokio::fs::read_dir(folder)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
        {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_FILE_EXTENSION))
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
