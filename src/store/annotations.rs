use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::geo::GeoBounds;

/// A region of interest to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    pub id: i64,
    pub bounds: GeoBounds,
}

impl Annotation {
    pub fn new(id: i64, bounds: GeoBounds) -> Self {
        Self { id, bounds }
    }
}

// intervals: id, zoomLevel, importance, startLng, endLng, startLat, endLat, ...
// The stored startLat is the northern edge.
const COL_ID: usize = 0;
const COL_START_LNG: usize = 3;
const COL_END_LNG: usize = 4;
const COL_NORTH_LAT: usize = 5;
const COL_SOUTH_LAT: usize = 6;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(COL_ID)?,
        bounds: GeoBounds {
            start_lng: row.get(COL_START_LNG)?,
            end_lng: row.get(COL_END_LNG)?,
            start_lat: row.get(COL_SOUTH_LAT)?,
            end_lat: row.get(COL_NORTH_LAT)?,
        },
    })
}

/// Read all rows of the `intervals` table in storage order.
pub fn load_annotations(conn: &Connection) -> Result<Vec<Annotation>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM intervals")?;
    if stmt.column_count() <= COL_SOUTH_LAT {
        return Err(StoreError::InvalidRow {
            table: "intervals",
            message: format!(
                "expected at least {} columns, found {}",
                COL_SOUTH_LAT + 1,
                stmt.column_count()
            ),
        });
    }

    let rows = stmt.query_map([], from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}
