//! landmask CLI - threshold index rasters into land-cover masks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use landmask_algorithms::imagery::Band;
use landmask_algorithms::pipeline::{run_product, ProductConfig, ProductInputs, PRESET_NAMES};
use landmask_algorithms::refine::Connectivity;
use landmask_algorithms::vectorize::{class_areas_hectares, vectorize_classes};
use landmask_core::io::read_geotiff;
use landmask_core::{Feature, Raster, RasterElement, Region};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landmask")]
#[command(author, version, about = "Statistical thresholding of index rasters into land-cover masks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Print built-in product presets as TOML
    Presets {
        /// Only this preset (flood, vegetation, soil, moisture)
        name: Option<String>,
    },
    /// Run a product over index or band rasters
    Run {
        /// Preset name or path to a product TOML file
        #[arg(short, long)]
        product: String,
        /// Finished index raster, NAME=PATH (repeatable)
        #[arg(long = "index", value_name = "NAME=PATH")]
        indices: Vec<String>,
        /// Input band raster, NAME=PATH (repeatable; e.g. nir=b8.tif)
        #[arg(long = "band", value_name = "NAME=PATH")]
        bands: Vec<String>,
        /// Water seasonality raster (months of water per year)
        #[arg(long)]
        water: Option<PathBuf>,
        /// Elevation model for the slope exclusion
        #[arg(long)]
        dem: Option<PathBuf>,
        #[command(flatten)]
        region: RegionArgs,
        /// Override the product's nominal scale (ground units)
        #[arg(short, long)]
        scale: Option<f64>,
        /// Override the product's connectivity (4 or 8)
        #[arg(short, long)]
        connectivity: Option<u8>,
        /// Write the polygons of every index to this GeoJSON file
        #[arg(long)]
        polygons: Option<PathBuf>,
        /// Write the JSON summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Vectorize every class of a classification raster
    Classes {
        /// Input classification raster (integer class codes)
        input: PathBuf,
        #[command(flatten)]
        region: RegionArgs,
        /// Nominal scale; defaults to the raster cell size
        #[arg(short, long)]
        scale: Option<f64>,
        /// Connectivity (4 or 8)
        #[arg(short, long, default_value = "8")]
        connectivity: u8,
        /// Write the class polygons to this GeoJSON file
        #[arg(long)]
        polygons: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RegionArgs {
    /// Region of interest as a GeoJSON file of polygons
    #[arg(long, conflicts_with = "bbox")]
    region: Option<PathBuf>,
    /// Region of interest as min_x,min_y,max_x,max_y
    #[arg(long, value_name = "MINX,MINY,MAXX,MAXY")]
    bbox: Option<String>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner(&format!("Reading {}...", path.display()));
    let raster: Raster<T> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

/// Split `NAME=PATH`
fn parse_assignment(s: &str) -> Result<(String, PathBuf)> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => bail!("Expected NAME=PATH, got: {}", s),
    }
}

fn parse_bbox(s: &str) -> Result<Region> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().context("Invalid bbox coordinate"))
        .collect::<Result<_>>()?;
    let [min_x, min_y, max_x, max_y] = parts[..] else {
        bail!("bbox must be min_x,min_y,max_x,max_y, got: {}", s);
    };
    if min_x >= max_x || min_y >= max_y {
        bail!("bbox is empty: {}", s);
    }
    Ok(Region::from_bounds(min_x, min_y, max_x, max_y))
}

/// Polygons and multipolygons of a GeoJSON file as one region
fn read_region_geojson(path: &Path) -> Result<Region> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read region {}", path.display()))?;
    let gj: geojson::GeoJson = text.parse().context("Invalid GeoJSON")?;
    let collection: geo_types::GeometryCollection<f64> =
        geojson::quick_collection(&gj).context("Unsupported GeoJSON geometry")?;

    let mut polygons = Vec::new();
    for geometry in collection {
        match geometry {
            geo_types::Geometry::Polygon(p) => polygons.push(p),
            geo_types::Geometry::MultiPolygon(mp) => polygons.extend(mp),
            _ => {}
        }
    }
    if polygons.is_empty() {
        bail!("{} contains no polygons", path.display());
    }
    Ok(Region::from_multi_polygon(geo_types::MultiPolygon(polygons)))
}

/// Region from the arguments, or the full extent of `fallback`
fn resolve_region<T: RasterElement>(args: &RegionArgs, fallback: Option<&Raster<T>>) -> Result<Region> {
    if let Some(path) = &args.region {
        return read_region_geojson(path);
    }
    if let Some(bbox) = &args.bbox {
        return parse_bbox(bbox);
    }
    match fallback {
        Some(raster) => Ok(Region::covering(raster)),
        None => bail!("No region given and no raster to take the extent from"),
    }
}

fn load_product(name_or_path: &str) -> Result<ProductConfig> {
    if let Some(preset) = ProductConfig::preset(name_or_path) {
        return Ok(preset);
    }
    let path = Path::new(name_or_path);
    if path.exists() {
        return ProductConfig::from_file(path).context("Invalid product file");
    }
    bail!(
        "Unknown product '{}'. Use one of {} or a TOML file.",
        name_or_path,
        PRESET_NAMES.join(", ")
    )
}

fn to_geojson_feature(feature: &Feature) -> Result<geojson::Feature> {
    let mut properties = geojson::JsonObject::new();
    for (key, value) in &feature.properties {
        properties.insert(key.clone(), serde_json::to_value(value)?);
    }
    Ok(geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &feature.geometry,
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn write_geojson<I>(features: I, path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = Feature>,
{
    let features = features
        .into_iter()
        .map(|f| to_geojson_feature(&f))
        .collect::<Result<Vec<_>>>()?;
    let count = features.len();
    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    fs::write(path, geojson::GeoJson::from(collection).to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(count)
}

fn write_json(value: &serde_json::Value, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?
        }
        None => println!("{}", text),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster: Raster<f64> = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
            }
            if let (Some(mean), Some(std_dev)) = (stats.mean, stats.std_dev) {
                println!("  Mean: {:.4}", mean);
                println!("  Std dev: {:.4}", std_dev);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Presets ──────────────────────────────────────────────────
        Commands::Presets { name } => {
            let names: Vec<&str> = match &name {
                Some(n) => vec![n.as_str()],
                None => PRESET_NAMES.to_vec(),
            };
            for (i, n) in names.iter().enumerate() {
                let preset = ProductConfig::preset(n).with_context(|| {
                    format!("Unknown preset '{}'. Use one of {}", n, PRESET_NAMES.join(", "))
                })?;
                if i > 0 {
                    println!();
                }
                println!("# {}", preset.name);
                print!("{}", preset.to_toml_string()?);
            }
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            product,
            indices,
            bands,
            water,
            dem,
            region,
            scale,
            connectivity,
            polygons,
            output,
        } => {
            let mut config = load_product(&product)?;
            if scale.is_some() {
                config.scale = scale;
            }
            if let Some(c) = connectivity {
                config.connectivity = Connectivity::try_from(c)?;
            }
            config.validate()?;

            let mut inputs = ProductInputs::new();
            let mut index_names = Vec::new();
            for arg in &indices {
                let (name, path) = parse_assignment(arg)?;
                inputs.insert_index(&name, read_raster(&path)?);
                index_names.push(name);
            }
            for arg in &bands {
                let (name, path) = parse_assignment(arg)?;
                let band: Band = name.parse()?;
                inputs.bands.insert(band, read_raster(&path)?);
            }
            if let Some(path) = &water {
                inputs = inputs.with_water_seasonality(read_raster(path)?);
            }
            if let Some(path) = &dem {
                inputs = inputs.with_dem(read_raster(path)?);
            }

            let extent = index_names
                .first()
                .and_then(|name| inputs.index(name))
                .or_else(|| inputs.bands.iter().next().map(|(_, r)| r));
            let region = resolve_region(&region, extent)?;

            let start = Instant::now();
            let pb = spinner(&format!("Running {}...", config.name));
            let result = run_product(&config, &inputs, &region)
                .with_context(|| format!("Product '{}' failed", config.name))?;
            pb.finish_and_clear();
            info!("Processing time: {:.2?}", start.elapsed());

            if let Some(path) = &polygons {
                let mut features = Vec::new();
                for index in &result.indices {
                    features.extend(index.polygons(&region)?);
                }
                let count = write_geojson(features, path)?;
                info!("{} polygons saved to: {}", count, path.display());
            }

            write_json(&serde_json::to_value(result.summary())?, output.as_deref())?;
        }

        // ── Classes ──────────────────────────────────────────────────
        Commands::Classes {
            input,
            region,
            scale,
            connectivity,
            polygons,
        } => {
            let classes: Raster<i32> = read_raster(&input)?;
            let region = resolve_region(&region, Some(&classes))?;
            let scale = scale.unwrap_or_else(|| classes.cell_size());
            let connectivity = Connectivity::try_from(connectivity)?;

            let areas = class_areas_hectares(&classes, &region, scale)?;
            if let Some(path) = &polygons {
                let features = vectorize_classes(&classes, &region, scale, connectivity)?;
                let count = write_geojson(features, path)?;
                info!("{} polygons saved to: {}", count, path.display());
            }

            let report: serde_json::Map<String, serde_json::Value> = areas
                .into_iter()
                .map(|(class, area)| Ok((class.to_string(), serde_json::to_value(area)?)))
                .collect::<Result<_>>()?;
            write_json(&serde_json::Value::Object(report), None)?;
        }
    }

    Ok(())
}
