use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::Place;

/// Write the catalog as zstd-compressed postcard: the compact form for
/// machine consumers, next to the JSON catalog meant for humans.
pub fn write(path: &Path, places: &[Place]) -> Result<()> {
    let mut writer = zstd::Encoder::new(File::create(path)?, 0)?;
    let data = postcard::to_allocvec(places)?;
    writer.write_all(data.as_slice())?;
    writer.finish()?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Vec<Place>> {
    let file = File::open(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut data = Vec::new();
    zstd::Decoder::new(file)?.read_to_end(&mut data)?;
    Ok(postcard::from_bytes(&data)?)
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;
    use std::fs::remove_file;

    use super::*;
    use crate::model::Source;

    #[test]
    fn round_trip() {
        let mut place = Place::new("n1", Source::Osm, "Jollibee Makati", 14.5547, 121.0244);
        place.cuisine_tags = vec!["filipino".to_string()];
        let place = place.refine();

        let path = temp_dir().join(format!("conflate-snapshot-{}.bin.zst", std::process::id()));
        write(&path, &[place.clone()]).unwrap();
        let places = read(&path).unwrap();
        remove_file(&path).unwrap();

        assert_eq!(places, vec![place]);
    }
}
