/// Floating button placement: per-site saved positions and drag geometry
use crate::errors::StorageError;
use crate::storage::{self, Area, Storage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Local-area key holding the position map
pub const POSITIONS_KEY: &str = "buttonPosition";

/// Button edge length in px
pub const BUTTON_SIZE: f64 = 48.0;

/// Pointer travel (px) that turns a press into a drag instead of a click
pub const DRAG_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Saved button positions keyed by hostname
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonPositions(BTreeMap<String, Point>);

impl ButtonPositions {
    pub async fn load<S: Storage>(storage: &S) -> Result<ButtonPositions, StorageError> {
        Ok(storage::load(storage, Area::Local, POSITIONS_KEY).await?.unwrap_or_default())
    }

    pub fn get(&self, hostname: &str) -> Option<Point> {
        self.0.get(hostname).copied()
    }

    pub fn set(&mut self, hostname: &str, point: Point) {
        self.0.insert(hostname.to_string(), point);
    }
}

/// Look up the saved position for a site
pub async fn position_for<S: Storage>(storage: &S, hostname: &str) -> Result<Option<Point>, StorageError> {
    Ok(ButtonPositions::load(storage).await?.get(hostname))
}

/// Persist the position the button was dropped at
pub async fn remember_position<S: Storage>(storage: &S, hostname: &str, point: Point) -> Result<(), StorageError> {
    let mut positions = ButtonPositions::load(storage).await?;
    positions.set(hostname, point);
    storage::save(storage, Area::Local, POSITIONS_KEY, &positions).await
}

/// Hostname part of a page URL, lowercased
pub fn hostname_of(page_url: &str) -> Option<String> {
    Url::parse(page_url)
        .ok()?
        .host_str()
        .map(|host| host.to_lowercase())
}

/// Whether the pointer moved far enough from where it was pressed to count as a drag
pub fn exceeds_drag_threshold(start: (f64, f64), current: (f64, f64)) -> bool {
    let dx = current.0 - start.0;
    let dy = current.1 - start.1;
    (dx * dx + dy * dy).sqrt() > DRAG_THRESHOLD
}

/// Keep the button's top-left corner inside the viewport
pub fn clamp_to_viewport(x: f64, y: f64, viewport_width: f64, viewport_height: f64) -> Point {
    let max_x = (viewport_width - BUTTON_SIZE).max(0.0);
    let max_y = (viewport_height - BUTTON_SIZE).max(0.0);
    Point {
        x: x.clamp(0.0, max_x) as i32,
        y: y.clamp(0.0, max_y) as i32,
    }
}
