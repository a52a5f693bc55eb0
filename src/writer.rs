use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::FeatureCollection;

use crate::error::ConvertError;

/// Serialize the whole collection, then write it to `path` in one go.
/// Nothing touches the destination if serialization fails.
pub fn write_geojson(
    path: &Path,
    collection: &FeatureCollection,
    pretty: bool,
) -> Result<(), ConvertError> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(collection)
    } else {
        serde_json::to_vec(collection)
    }
    .map_err(|source| ConvertError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| ConvertError::io(path, e))?;

    Ok(())
}
