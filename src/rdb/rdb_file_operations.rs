use std::{path::Path, sync::Arc};

use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use crate::key_value_store::KeyValueStore;

/// Writes a point-in-time image of the store to `path`, creating the parent
/// directory if needed. The store lock is only held while encoding.
pub async fn save_rdb_file(store: &Arc<Mutex<KeyValueStore>>, path: &Path) -> tokio::io::Result<()> {
    let image = {
        let mut store_guard = store.lock().await;
        store_guard.snapshot()
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(path, &image).await?;
    debug!("saved {} byte snapshot to {}", image.len(), path.display());

    Ok(())
}

/// Restores the store from `path`. A missing file is not an error and leaves
/// the store empty; `Ok(false)` means the file was there but unusable.
pub async fn load_rdb_file(store: &Arc<Mutex<KeyValueStore>>, path: &Path) -> tokio::io::Result<bool> {
    let image = match fs::read(path).await {
        Ok(image) => image,
        Err(e) if e.kind() == tokio::io::ErrorKind::NotFound => {
            info!("no snapshot at {}, starting empty", path.display());
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let mut store_guard = store.lock().await;
    let restored = store_guard.restore(&image);
    if restored {
        info!(
            "restored {} keys from {}",
            store_guard.keys(None).len(),
            path.display()
        );
    }

    Ok(restored)
}
