use std::fs;
use std::path::Path;

use diesel::sqlite::SqliteConnection;

use crate::accounts::{PROFILE_IMAGE, RECORD_TYPE};
use crate::error::Result;
use crate::models::{Blob, User};
use crate::storage::{self, DiskService, ResizeToLimit, Slot, Upload, Variant};

/// Bundled placeholder, relative to the assets directory.
pub const DEFAULT_IMAGE: &str = "no_image.jpg";
const DEFAULT_FILENAME: &str = "default-image.jpg";
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

impl User {
    fn profile_image_slot(&self) -> Slot<'static> {
        Slot {
            record_type: RECORD_TYPE,
            record_id: self.id,
            name: PROFILE_IMAGE,
        }
    }

    pub fn profile_image(&self, conn: &mut SqliteConnection) -> Result<Option<Blob>> {
        storage::attached(conn, self.profile_image_slot())
    }

    pub fn attach_profile_image(
        &self,
        conn: &mut SqliteConnection,
        disk: &DiskService,
        upload: &Upload<'_>,
    ) -> Result<Blob> {
        storage::attach(conn, disk, self.profile_image_slot(), upload)
    }

    pub fn purge_profile_image(&self, conn: &mut SqliteConnection, disk: &DiskService) -> Result<bool> {
        storage::purge(conn, disk, self.profile_image_slot())
    }

    /// The profile image resized to fit within `width` x `height`. Accounts
    /// without one get the bundled placeholder attached first.
    pub fn get_profile_image(
        &self,
        conn: &mut SqliteConnection,
        disk: &DiskService,
        assets_dir: &Path,
        width: u32,
        height: u32,
    ) -> Result<Variant> {
        let resize = ResizeToLimit::new(width, height)?;
        let blob = match self.profile_image(conn)? {
            Some(blob) => blob,
            None => {
                let bytes = fs::read(assets_dir.join(DEFAULT_IMAGE))?;
                tracing::debug!(user_id = self.id, "attaching default profile image");
                self.attach_profile_image(
                    conn,
                    disk,
                    &Upload {
                        filename: DEFAULT_FILENAME,
                        content_type: DEFAULT_CONTENT_TYPE,
                        bytes: &bytes,
                    },
                )?
            }
        };
        storage::variant(disk, &blob, resize)
    }
}
