//! SQLite-backed provider and ingestion helpers.
//!
//! A [`SqliteProvider`] maps an arbitrary table onto [`GeoRecord`]s through
//! a [`TableMapping`]: the embedding application names the table and the
//! columns holding id, WKB geometry, and the four envelope ordinates, plus
//! an optional filter fragment AND-ed into every query. Bounding-box
//! queries become a single SELECT restricted to envelope overlap; requested
//! attribute names are appended to the column list.

use std::fmt;
use std::path::{Path, PathBuf};

use geo::{Coord, Rect};
use geomarket_core::{Attributes, GeoProvider, GeoRecord, QueryError, query_envelope, wkb};
use log::warn;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use serde_json::Value;
use thiserror::Error;

/// Names of the table and columns backing a [`SqliteProvider`].
#[derive(Debug, Clone)]
pub struct TableMapping {
    /// Table holding one row per record.
    pub table: String,
    /// Integer id column.
    pub id: String,
    /// Blob column with the WKB geometry.
    pub geometry: String,
    /// Column with the envelope's minimum x ordinate.
    pub x_min: String,
    /// Column with the envelope's minimum y ordinate.
    pub y_min: String,
    /// Column with the envelope's maximum x ordinate.
    pub x_max: String,
    /// Column with the envelope's maximum y ordinate.
    pub y_max: String,
    /// Optional SQL fragment AND-ed into every query.
    pub filter: Option<String>,
}

impl TableMapping {
    /// Mapping with the conventional column names for `table`.
    ///
    /// The conventional schema is the one [`write_table`] creates:
    /// `id`, `wkb`, `xmin`, `ymin`, `xmax`, `ymax`.
    pub fn new<T>(table: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            table: table.into(),
            id: String::from("id"),
            geometry: String::from("wkb"),
            x_min: String::from("xmin"),
            y_min: String::from("ymin"),
            x_max: String::from("xmax"),
            y_max: String::from("ymax"),
            filter: None,
        }
    }

    /// Attach a filter fragment applied to every query.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Into<String>,
    {
        self.filter = Some(filter.into());
        self
    }

    /// SELECT restricted to envelope overlap, with closed-interval
    /// comparisons so touching envelopes (and point envelopes) match.
    fn select_sql(&self, attributes: &[String]) -> String {
        let mut columns = vec![
            quote(&self.id),
            quote(&self.geometry),
            quote(&self.x_min),
            quote(&self.y_min),
            quote(&self.x_max),
            quote(&self.y_max),
        ];
        columns.extend(attributes.iter().map(|name| quote(name)));

        let mut sql = format!(
            "SELECT {} FROM {} WHERE ",
            columns.join(", "),
            quote(&self.table)
        );
        if let Some(filter) = &self.filter {
            sql.push_str(&format!("({filter}) AND "));
        }
        sql.push_str(&format!(
            "{x_min} <= ?1 AND {x_max} >= ?2 AND {y_min} <= ?3 AND {y_max} >= ?4",
            x_min = quote(&self.x_min),
            x_max = quote(&self.x_max),
            y_min = quote(&self.y_min),
            y_max = quote(&self.y_max),
        ));
        sql
    }
}

/// Double-quote an identifier so arbitrary table and column names stay
/// literal inside the generated SQL.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Error raised when opening or writing a record database.
#[derive(Debug, Error)]
pub enum SqliteProviderError {
    /// Opening the database file failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A record id does not fit the signed 64-bit integer column.
    #[error("record id {id} does not fit in a signed 64-bit database column")]
    IdOutOfRange {
        /// Offending record id.
        id: u64,
    },
    /// Generic SQLite error.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Read-only [`GeoProvider`] over a mapped SQLite table.
pub struct SqliteProvider {
    connection: Connection,
    mapping: TableMapping,
}

impl fmt::Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl SqliteProvider {
    /// Open `path` read-only with the given mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteProviderError::Open`] when the file is missing or
    /// not a database.
    pub fn open<P>(path: P, mapping: TableMapping) -> Result<Self, SqliteProviderError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| SqliteProviderError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            connection,
            mapping,
        })
    }

    fn select_records(
        &self,
        envelope: &Rect<f64>,
        attributes: &[String],
    ) -> Result<Vec<GeoRecord>, SqliteProviderError> {
        let sql = self.mapping.select_sql(attributes);
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query(params![
            envelope.max().x,
            envelope.min().x,
            envelope.max().y,
            envelope.min().y,
        ])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let geometry: Vec<u8> = row.get(1)?;
            let x_min: f64 = row.get(2)?;
            let y_min: f64 = row.get(3)?;
            let x_max: f64 = row.get(4)?;
            let y_max: f64 = row.get(5)?;

            if let Err(error) = wkb::validate(&geometry) {
                warn!("skipping record {id}: undecodable geometry: {error}");
                continue;
            }

            let mut values = Attributes::new();
            for (offset, name) in attributes.iter().enumerate() {
                values.insert(name.clone(), column_value(row.get_ref(6 + offset)?));
            }

            records.push(GeoRecord::new(
                id,
                geometry,
                Rect::new(Coord { x: x_min, y: y_min }, Coord { x: x_max, y: y_max }),
                values,
            ));
        }
        Ok(records)
    }
}

impl GeoProvider for SqliteProvider {
    fn query_bbox(
        &self,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        attributes: &[String],
    ) -> Result<Box<dyn Iterator<Item = GeoRecord> + Send + '_>, QueryError> {
        let envelope = query_envelope(xmin, ymin, xmax, ymax)?;
        let records = self
            .select_records(&envelope, attributes)
            .map_err(QueryError::backend)?;
        Ok(Box::new(records.into_iter()))
    }
}

/// Map a database cell onto an attribute value.
fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => {
            serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Map an attribute value onto a database cell.
fn attribute_value(value: Option<&Value>) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        None | Some(Value::Null) => Sql::Null,
        Some(Value::Bool(flag)) => Sql::Integer(i64::from(*flag)),
        Some(Value::Number(number)) => number.as_i64().map_or_else(
            || number.as_f64().map_or(Sql::Null, Sql::Real),
            Sql::Integer,
        ),
        Some(Value::String(text)) => Sql::Text(text.clone()),
        Some(other) => Sql::Text(other.to_string()),
    }
}

/// Create `table` at `path` with the conventional schema and insert the
/// records in one transaction. Returns the number of rows written.
///
/// Attribute columns are the union of attribute keys across the records,
/// in sorted order, so [`TableMapping::new`] plus the attribute names are
/// enough to query the result back.
///
/// # Errors
///
/// Returns [`SqliteProviderError::IdOutOfRange`] for ids beyond `i64::MAX`
/// and database errors otherwise.
pub fn write_table(
    path: &Path,
    table: &str,
    records: &[GeoRecord],
) -> Result<usize, SqliteProviderError> {
    let mut connection =
        Connection::open(path).map_err(|source| SqliteProviderError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut attribute_names: Vec<String> = records
        .iter()
        .flat_map(|record| record.attributes.keys().cloned())
        .collect();
    attribute_names.sort_unstable();
    attribute_names.dedup();

    let mut columns = vec![
        format!("{} INTEGER PRIMARY KEY", quote("id")),
        format!("{} BLOB NOT NULL", quote("wkb")),
        format!("{} REAL NOT NULL", quote("xmin")),
        format!("{} REAL NOT NULL", quote("ymin")),
        format!("{} REAL NOT NULL", quote("xmax")),
        format!("{} REAL NOT NULL", quote("ymax")),
    ];
    columns.extend(attribute_names.iter().map(|name| quote(name)));
    connection.execute(
        &format!("CREATE TABLE {} ({})", quote(table), columns.join(", ")),
        [],
    )?;

    let placeholders: Vec<String> = (1..=6 + attribute_names.len())
        .map(|position| format!("?{position}"))
        .collect();
    let insert_sql = format!(
        "INSERT INTO {} VALUES ({})",
        quote(table),
        placeholders.join(", ")
    );

    let transaction = connection.transaction()?;
    {
        let mut statement = transaction.prepare(&insert_sql)?;
        for record in records {
            let id = i64::try_from(record.id)
                .map_err(|_| SqliteProviderError::IdOutOfRange { id: record.id })?;
            let mut values: Vec<rusqlite::types::Value> = vec![
                rusqlite::types::Value::Integer(id),
                rusqlite::types::Value::Blob(record.wkb.clone()),
                rusqlite::types::Value::Real(record.envelope.min().x),
                rusqlite::types::Value::Real(record.envelope.min().y),
                rusqlite::types::Value::Real(record.envelope.max().x),
                rusqlite::types::Value::Real(record.envelope.max().y),
            ];
            for name in &attribute_names {
                values.push(attribute_value(record.attributes.get(name)));
            }
            statement.execute(params_from_iter(values))?;
        }
    }
    transaction.commit()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomarket_core::test_support::{square_record, square_with_hole};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[fixture]
    fn temp_database() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("records.db");
        (dir, path)
    }

    fn ids(records: Vec<GeoRecord>) -> Vec<u64> {
        let mut ids: Vec<u64> = records.into_iter().map(|record| record.id).collect();
        ids.sort_unstable();
        ids
    }

    #[rstest]
    fn round_trips_records_through_the_database(
        #[from(temp_database)] (_dir, path): (TempDir, PathBuf),
    ) {
        let records = vec![
            square_record(1, 0.0, 0.0, "centre"),
            square_record(2, 10.0, 10.0, "suburb"),
        ];
        assert_eq!(write_table(&path, "records", &records).expect("write"), 2);

        let provider =
            SqliteProvider::open(&path, TableMapping::new("records")).expect("open");
        let found = provider
            .query_bbox(-1.0, -1.0, 2.0, 2.0, &[])
            .expect("query")
            .collect();
        assert_eq!(ids(found), vec![1]);
    }

    #[rstest]
    fn touching_envelopes_match(#[from(temp_database)] (_dir, path): (TempDir, PathBuf)) {
        // Unit square at (0, 0); a query that only touches its right edge
        // at x = 1 must still return it.
        write_table(&path, "records", &[square_record(1, 0.0, 0.0, "edge")]).expect("write");
        let provider =
            SqliteProvider::open(&path, TableMapping::new("records")).expect("open");
        let found = provider
            .query_bbox(1.0, 0.5, 2.0, 0.6, &[])
            .expect("query")
            .count();
        assert_eq!(found, 1);
    }

    #[rstest]
    fn returns_requested_attribute_columns_only(
        #[from(temp_database)] (_dir, path): (TempDir, PathBuf),
    ) {
        let mut record = square_record(1, 0.0, 0.0, "alpha");
        record.attributes.insert(String::from("value"), json!(42));
        write_table(&path, "records", &[record]).expect("write");

        let provider =
            SqliteProvider::open(&path, TableMapping::new("records")).expect("open");
        let found: Vec<GeoRecord> = provider
            .query_bbox(-1.0, -1.0, 2.0, 2.0, &[String::from("value")])
            .expect("query")
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attributes.len(), 1);
        assert_eq!(found[0].attributes.get("value"), Some(&json!(42)));
    }

    #[rstest]
    fn filter_fragment_restricts_results(
        #[from(temp_database)] (_dir, path): (TempDir, PathBuf),
    ) {
        let mut low = square_record(1, 0.0, 0.0, "low");
        low.attributes.insert(String::from("value"), json!(5));
        let mut high = square_record(2, 2.0, 0.0, "high");
        high.attributes.insert(String::from("value"), json!(50));
        write_table(&path, "records", &[low, high]).expect("write");

        let mapping = TableMapping::new("records").with_filter("value > 10");
        let provider = SqliteProvider::open(&path, mapping).expect("open");
        let found = provider
            .query_bbox(-10.0, -10.0, 10.0, 10.0, &[])
            .expect("query")
            .collect();
        assert_eq!(ids(found), vec![2]);
    }

    #[rstest]
    fn corrupt_rows_are_skipped(#[from(temp_database)] (_dir, path): (TempDir, PathBuf)) {
        let good = square_record(1, 0.0, 0.0, "good");
        let corrupt = GeoRecord::new(
            2,
            vec![0x01, 0x02, 0x03],
            good.envelope,
            Attributes::new(),
        );
        write_table(&path, "records", &[good, corrupt]).expect("write");

        let provider =
            SqliteProvider::open(&path, TableMapping::new("records")).expect("open");
        let found = provider
            .query_bbox(-10.0, -10.0, 10.0, 10.0, &[])
            .expect("query")
            .collect();
        assert_eq!(ids(found), vec![1]);
    }

    #[rstest]
    fn point_queries_use_exact_containment(
        #[from(temp_database)] (_dir, path): (TempDir, PathBuf),
    ) {
        let record = GeoRecord::from_polygon(1, &square_with_hole(), Attributes::new())
            .expect("valid polygon");
        write_table(&path, "records", &[record]).expect("write");

        let provider =
            SqliteProvider::open(&path, TableMapping::new("records")).expect("open");
        // Inside the hole: envelope overlap but no exact containment.
        assert_eq!(provider.query_point(5.0, 5.0, &[]).expect("query").count(), 0);
        assert_eq!(provider.query_point(1.0, 1.0, &[]).expect("query").count(), 1);
    }

    #[rstest]
    fn open_fails_for_missing_file() {
        let error = SqliteProvider::open("/non-existent/records.db", TableMapping::new("records"))
            .expect_err("missing file");
        assert!(matches!(error, SqliteProviderError::Open { .. }));
    }

    #[rstest]
    fn mapped_column_names_are_honoured(
        #[from(temp_database)] (_dir, path): (TempDir, PathBuf),
    ) {
        let connection = Connection::open(&path).expect("create database");
        connection
            .execute(
                "CREATE TABLE shapes (
                    shape_id INTEGER PRIMARY KEY,
                    geom BLOB NOT NULL,
                    west REAL, south REAL, east REAL, north REAL
                )",
                [],
            )
            .expect("create table");
        let record = square_record(9, 3.0, 3.0, "mapped");
        connection
            .execute(
                "INSERT INTO shapes VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    9_i64,
                    record.wkb,
                    record.envelope.min().x,
                    record.envelope.min().y,
                    record.envelope.max().x,
                    record.envelope.max().y,
                ],
            )
            .expect("insert row");
        drop(connection);

        let mapping = TableMapping {
            table: String::from("shapes"),
            id: String::from("shape_id"),
            geometry: String::from("geom"),
            x_min: String::from("west"),
            y_min: String::from("south"),
            x_max: String::from("east"),
            y_max: String::from("north"),
            filter: None,
        };
        let provider = SqliteProvider::open(&path, mapping).expect("open");
        let found = provider
            .query_bbox(0.0, 0.0, 10.0, 10.0, &[])
            .expect("query")
            .collect();
        assert_eq!(ids(found), vec![9]);
    }
}
