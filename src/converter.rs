use geo::{BoundingRect, MultiPoint, Point};
use geojson::{Bbox, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use tracing::trace;

use crate::table::{Cell, Row, Table};

pub const DEFAULT_LATITUDE_COLUMN: &str = "Latitude";
pub const DEFAULT_LONGITUDE_COLUMN: &str = "Longitude";

/// Names of the columns holding the coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub latitude: String,
    pub longitude: String,
}

impl CoordinateColumns {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }
}

impl Default for CoordinateColumns {
    fn default() -> Self {
        Self::new(DEFAULT_LATITUDE_COLUMN, DEFAULT_LONGITUDE_COLUMN)
    }
}

/// Validity predicate: both coordinate cells present and finite numbers.
/// Returns the location as a lon/lat point.
pub fn row_point(row: &Row, columns: &CoordinateColumns) -> Option<Point<f64>> {
    let latitude = row.get(&columns.latitude)?.as_f64()?;
    let longitude = row.get(&columns.longitude)?.as_f64()?;
    Some(Point::new(longitude, latitude))
}

/// All non-missing cells of the row, in column order. Coordinate columns are kept.
pub fn row_properties(row: &Row) -> JsonObject {
    row.iter()
        .filter(|(_, cell)| !cell.is_missing())
        .map(|(name, cell)| (name.to_string(), cell_to_json(cell)))
        .collect()
}

fn cell_to_json(cell: &Cell) -> JsonValue {
    match cell {
        Cell::Missing => JsonValue::Null,
        Cell::Integer(i) => JsonValue::from(*i),
        // JSON has no representation for inf
        Cell::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(f.to_string())),
        Cell::Text(s) => JsonValue::String(s.clone()),
    }
}

fn point_feature(point: Point<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.x(), point.y()]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert every row with valid coordinates into a Point feature, keeping row order.
/// Rows failing the predicate are dropped.
pub fn to_feature_collection(table: &Table, columns: &CoordinateColumns) -> FeatureCollection {
    let mut features = Vec::with_capacity(table.rows.len());

    for (index, row) in table.rows.iter().enumerate() {
        match row_point(row, columns) {
            Some(point) => features.push(point_feature(point, row_properties(row))),
            None => trace!(row = index, "Skipping row without valid coordinates"),
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// `[min_lon, min_lat, max_lon, max_lat]` over all point features, if any.
pub fn feature_collection_bbox(collection: &FeatureCollection) -> Option<Bbox> {
    let points: Vec<Point<f64>> = collection
        .features
        .iter()
        .filter_map(|feature| match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(coords)) if coords.len() >= 2 => Some(Point::new(coords[0], coords[1])),
            _ => None,
        })
        .collect();

    let rect = MultiPoint::new(points).bounding_rect()?;
    Some(vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn table(text: &str) -> Table {
        Table::from_reader(text.as_bytes(), b'\t', Path::new("test.tsv")).unwrap()
    }

    fn row(cells: &[(&str, Cell)]) -> Row {
        Row::new(
            cells
                .iter()
                .map(|(name, cell)| (name.to_string(), cell.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_example_scenario() {
        let table = table(
            "Latitude\tLongitude\tMagnitude\n34.05\t-118.25\t5.1\n\t-100.0\t3.2\n10.0\tabc\t4.0\n",
        );
        let collection = to_feature_collection(&table, &CoordinateColumns::default());
        let json = serde_json::to_value(&collection).unwrap();

        assert_eq!(
            json,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [-118.25, 34.05]},
                    "properties": {"Latitude": 34.05, "Longitude": -118.25, "Magnitude": 5.1}
                }]
            })
        );
    }

    #[test]
    fn test_row_point_is_lon_lat() {
        let r = row(&[("Latitude", Cell::Float(10.5)), ("Longitude", Cell::Integer(20))]);
        let point = row_point(&r, &CoordinateColumns::default()).unwrap();
        assert_eq!(point.x(), 20.0);
        assert_eq!(point.y(), 10.5);
    }

    #[test]
    fn test_row_point_rejects_invalid() {
        let columns = CoordinateColumns::default();

        let missing = row(&[("Latitude", Cell::Missing), ("Longitude", Cell::Float(1.0))]);
        assert!(row_point(&missing, &columns).is_none());

        let absent = row(&[("Longitude", Cell::Float(1.0))]);
        assert!(row_point(&absent, &columns).is_none());

        let text = row(&[
            ("Latitude", Cell::Float(1.0)),
            ("Longitude", Cell::Text("east".to_string())),
        ]);
        assert!(row_point(&text, &columns).is_none());

        let infinite = row(&[
            ("Latitude", Cell::Float(f64::INFINITY)),
            ("Longitude", Cell::Float(1.0)),
        ]);
        assert!(row_point(&infinite, &columns).is_none());
    }

    #[test]
    fn test_zero_coordinates_are_valid() {
        let r = row(&[("Latitude", Cell::Integer(0)), ("Longitude", Cell::Float(0.0))]);
        assert!(row_point(&r, &CoordinateColumns::default()).is_some());
    }

    #[test]
    fn test_custom_columns() {
        let table = table("lat\tlon\n1.0\t2.0\n");
        let columns = CoordinateColumns::new("lat", "lon");

        let collection = to_feature_collection(&table, &columns);
        assert_eq!(collection.features.len(), 1);

        let defaults = to_feature_collection(&table, &CoordinateColumns::default());
        assert!(defaults.features.is_empty());
    }

    #[test]
    fn test_properties_drop_missing_and_keep_order() {
        let r = row(&[
            ("Year", Cell::Integer(2011)),
            ("Latitude", Cell::Float(38.3)),
            ("Deaths", Cell::Missing),
            ("Longitude", Cell::Float(142.4)),
            ("Name", Cell::Text(String::new())),
        ]);
        let properties = row_properties(&r);

        let keys: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Year", "Latitude", "Longitude", "Name"]);
        assert!(properties.values().all(|v| !v.is_null()));
        assert_eq!(properties["Year"], json!(2011));
    }

    #[test]
    fn test_non_finite_property_becomes_text() {
        let r = row(&[("Ratio", Cell::Float(f64::INFINITY))]);
        assert_eq!(row_properties(&r)["Ratio"], json!("inf"));
    }

    #[test]
    fn test_nan_and_overflow_cells_in_properties() {
        let table = table("Latitude\tLongitude\tA\tB\tC\tD\n1\t2\tNAN\t+nan\t1e400\t nan\n");
        let collection = to_feature_collection(&table, &CoordinateColumns::default());

        assert_eq!(
            JsonValue::Object(collection.features[0].properties.clone().unwrap()),
            json!({"Latitude": 1, "Longitude": 2, "C": "1e400"})
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let table = table("Id\tLatitude\tLongitude\n1\t1\t1\n2\t\t2\n3\t3\t3\n4\t4\t4\n");
        let collection = to_feature_collection(&table, &CoordinateColumns::default());

        let ids: Vec<JsonValue> = collection
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["Id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(3), json!(4)]);
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let table = table("Latitude\tLongitude\tName\n1.5\t2.5\ta\n-3\t4\tb\n");
        let columns = CoordinateColumns::default();

        let first = serde_json::to_string(&to_feature_collection(&table, &columns)).unwrap();
        let second = serde_json::to_string(&to_feature_collection(&table, &columns)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bbox() {
        let table = table("Latitude\tLongitude\n10\t-20\n-5\t30\n\t\n");
        let collection = to_feature_collection(&table, &CoordinateColumns::default());

        assert_eq!(
            feature_collection_bbox(&collection),
            Some(vec![-20.0, -5.0, 30.0, 10.0])
        );
    }

    #[test]
    fn test_bbox_empty() {
        let collection = to_feature_collection(&Table::default(), &CoordinateColumns::default());
        assert_eq!(feature_collection_bbox(&collection), None);
    }
}
