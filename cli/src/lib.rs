use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{anyhow, bail, Context, Result};
use plr_engine::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Header written above the segment table by `plr dump`.
pub const SEGMENT_HEADER: &str = "x_start,x_end,slope,y";

/// Sets up a stderr subscriber filtered by `RUST_LOG`, falling back to `level`.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads a JSON config, or the defaults if no file is given. Fields missing
/// from the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<PlrConfig> {
    let Some(path) = path else {
        return Ok(PlrConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PlrConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;

    debug!(?config, path = %path.display(), "loaded config");
    Ok(config)
}

/// Parses `key,position` lines into points.
///
/// Blank lines and lines starting with `#` are skipped, as is a first line
/// that does not parse as numbers (a CSV header).
pub fn parse_points(reader: impl BufRead) -> Result<Vec<Point>> {
    let mut points = Vec::new();

    for (ix, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_pair(line) {
            Some((x, y)) => points.push(Point::new(x, y)),
            None if ix == 0 => debug!(header = line, "skipping header"),
            None => bail!("line {}: expected `key,position`, got {:?}", ix + 1, line),
        }
    }

    Ok(points)
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let (x, y) = line.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn read_points(path: &Path) -> Result<Vec<Point>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_points(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

/// Parses a decimal key of type `K`.
pub fn parse_key<K: Key>(text: &str) -> Result<K> {
    K::from_str_radix(text.trim(), 10).map_err(|_| anyhow!("invalid key {:?}", text))
}

/// Reads an index blob. `raw` selects the raw format with the given record
/// layout; otherwise the blob must be framed.
pub fn read_index<K: Key>(path: &Path, raw: Option<Layout>) -> Result<SegmentArray<K>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let array = match raw {
        Some(layout) => SegmentArray::decode_raw(&bytes, layout),
        None => SegmentArray::decode(&bytes),
    }
    .with_context(|| format!("decoding {}", path.display()))?;

    info!(
        segments = array.len(),
        gamma = array.gamma(),
        path = %path.display(),
        "loaded index"
    );
    Ok(array)
}

/// Writes an index blob, raw or framed.
pub fn write_index<K: Key>(array: &SegmentArray<K>, path: &Path, raw: bool) -> Result<()> {
    let bytes = if raw {
        array.encode_raw()?
    } else {
        array.encode()?
    };

    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    info!(bytes = bytes.len(), path = %path.display(), "wrote index");
    Ok(())
}

/// Writes the segment table, one `x_start,x_end,slope,y` row per segment. An
/// absent end key leaves its column empty.
pub fn write_segments<K: Key>(array: &SegmentArray<K>, mut out: impl Write) -> Result<()> {
    writeln!(out, "{SEGMENT_HEADER}")?;
    for segment in array {
        let x_end = segment.x_end.map(|x| format!("{x:?}")).unwrap_or_default();
        writeln!(
            out,
            "{:?},{},{},{}",
            segment.x_start, x_end, segment.slope, segment.intercept
        )?;
    }
    out.flush()?;
    Ok(())
}

pub fn dump_segments<K: Key>(array: &SegmentArray<K>, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_segments(array, BufWriter::new(file))
        }
        None => write_segments(array, std::io::stdout().lock()),
    }
}

/// One line of `plr query` output: `key,lo,hi`, or `key,<error>` when the
/// lookup has no answer.
pub fn format_lookup<K: Key>(array: &SegmentArray<K>, key: K) -> String {
    match array.lookup(key) {
        Ok(pos) => format!("{key:?},{},{}", pos.lo, pos.hi),
        Err(err) => format!("{key:?},{err}"),
    }
}
